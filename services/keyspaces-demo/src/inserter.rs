use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use svckit::{
    database::{DatabaseConnection, QueryBuilder},
    errors::ClientError,
    ids::IdGenerator,
    metrics,
    types::BatchJob,
};

#[derive(Debug, Clone)]
pub struct InsertSettings {
    pub table: String,
    pub insert_limit: u64,
    pub insert_duration: Duration,
    pub batch_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct InsertRunStats {
    pub count: u64,
    pub batches: u64,
    pub start_time: Instant,
}

impl InsertRunStats {
    fn new() -> Self {
        Self {
            count: 0,
            batches: 0,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Generates rows and flushes them as idempotent unlogged batches until
/// either the row limit or the time budget is reached.
pub struct BatchInsertPipeline<G: IdGenerator> {
    worker: usize,
    conn: Arc<dyn DatabaseConnection>,
    ids: G,
    settings: InsertSettings,
}

impl<G: IdGenerator> BatchInsertPipeline<G> {
    pub fn new(
        worker: usize,
        conn: Arc<dyn DatabaseConnection>,
        ids: G,
        settings: InsertSettings,
    ) -> Self {
        Self {
            worker,
            conn,
            ids,
            settings,
        }
    }

    pub async fn run(mut self) -> Result<InsertRunStats, ClientError> {
        let mut stats = InsertRunStats::new();
        let statement = QueryBuilder::build_insert_query(&self.settings.table);
        let mut job = BatchJob::new(self.settings.batch_capacity);

        for _ in 0..self.settings.insert_limit {
            let id = self.ids.next_id().map_err(|e| {
                error!("worker {}: uid error: {}", self.worker, e);
                e
            })?;
            job.push(QueryBuilder::build_insert_entry(&statement, &id));
            stats.count += 1;

            if job.is_full() {
                Self::flush(self.conn.as_ref(), self.worker, &job, &mut stats).await?;
                job = BatchJob::new(self.settings.batch_capacity);
                info!(
                    "worker {}: inserted: count={} elapsed={:?}",
                    self.worker,
                    stats.count,
                    stats.elapsed()
                );
            }

            // Only cancellation point; never interrupts an in-flight batch.
            if stats.elapsed() >= self.settings.insert_duration {
                break;
            }
        }

        if !job.is_empty() {
            Self::flush(self.conn.as_ref(), self.worker, &job, &mut stats).await?;
        }

        info!(
            "worker {}: inserted: count={} batches={} elapsed={:?}",
            self.worker,
            stats.count,
            stats.batches,
            stats.elapsed()
        );
        Ok(stats)
    }

    async fn flush(
        conn: &dyn DatabaseConnection,
        worker: usize,
        job: &BatchJob,
        stats: &mut InsertRunStats,
    ) -> Result<(), ClientError> {
        let start = Instant::now();
        let result = conn.execute_batch(job).await;
        metrics::record_operation("batch", result.is_ok(), start.elapsed().as_secs_f64());

        if let Err(e) = result {
            error!("worker {}: execute batch error: {}", worker, e);
            return Err(e);
        }
        stats.batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnection, SequentialIds};
    use svckit::ids::TimeOrderedIdGenerator;
    use std::collections::HashSet;

    fn settings(limit: u64, duration: Duration, capacity: usize) -> InsertSettings {
        InsertSettings {
            table: "demo.demo1".to_string(),
            insert_limit: limit,
            insert_duration: duration,
            batch_capacity: capacity,
        }
    }

    #[tokio::test]
    async fn test_full_batches_then_partial_flush() {
        let conn = Arc::new(FakeConnection::new());
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::default(),
            settings(95, Duration::from_secs(60), 30),
        );

        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.count, 95);
        assert_eq!(stats.batches, 4);
        assert_eq!(conn.batch_sizes(), vec![30, 30, 30, 5]);
    }

    #[tokio::test]
    async fn test_entries_are_idempotent_inserts_in_generation_order() {
        let conn = Arc::new(FakeConnection::new());
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::default(),
            settings(3, Duration::from_secs(60), 30),
        );
        pipeline.run().await.unwrap();

        let batches = conn.batches();
        assert_eq!(batches.len(), 1);
        let ids: Vec<String> = batches[0]
            .entries()
            .iter()
            .map(|entry| {
                assert!(entry.is_idempotent());
                assert_eq!(entry.statement(), "insert into demo.demo1 (id, name) values (?,?)");
                assert_eq!(entry.arguments()[0], entry.arguments()[1]);
                entry.arguments()[0].to_string()
            })
            .collect();
        assert_eq!(ids, vec!["id-0", "id-1", "id-2"]);
    }

    #[tokio::test]
    async fn test_elapsed_budget_still_flushes_partial_batch() {
        let conn = Arc::new(FakeConnection::new());
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::default(),
            settings(1_000, Duration::ZERO, 30),
        );

        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.count, 1);
        assert_eq!(conn.batch_sizes(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_checked_after_each_row() {
        // Each flush takes 10ms of (paused) time; the 25ms budget trips after the third flush.
        let conn = Arc::new(FakeConnection::new().with_batch_latency(Duration::from_millis(10)));
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::default(),
            settings(1_000, Duration::from_millis(25), 2),
        );

        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.count, 6);
        assert_eq!(conn.batch_sizes(), vec![2, 2, 2]);
        assert_eq!(conn.total_entries(), stats.count);
    }

    #[tokio::test]
    async fn test_no_duplicate_ids_within_worker() {
        let conn = Arc::new(FakeConnection::new());
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            TimeOrderedIdGenerator::new(),
            settings(200, Duration::from_secs(60), 30),
        );
        pipeline.run().await.unwrap();

        let ids: HashSet<String> = conn
            .batches()
            .iter()
            .flat_map(|b| b.entries().iter().map(|e| e.arguments()[0].to_string()).collect::<Vec<_>>())
            .collect();
        assert_eq!(ids.len(), 200);
    }

    #[tokio::test]
    async fn test_batch_failure_is_fatal() {
        let conn = Arc::new(FakeConnection::new().failing_batch_at(1));
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::default(),
            settings(95, Duration::from_secs(60), 30),
        );

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, ClientError::BatchError(_)));
        // The first batch landed; nothing after the failed one was attempted.
        assert_eq!(conn.batch_sizes(), vec![30]);
    }

    #[tokio::test]
    async fn test_id_generation_failure_is_fatal() {
        let conn = Arc::new(FakeConnection::new());
        let pipeline = BatchInsertPipeline::new(
            0,
            conn.clone(),
            SequentialIds::failing_after(5),
            settings(95, Duration::from_secs(60), 30),
        );

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, ClientError::IdGenerationError(_)));
        assert!(conn.batches().is_empty());
    }
}
