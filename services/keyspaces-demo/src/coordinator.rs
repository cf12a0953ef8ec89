use std::future::Future;
use tokio::task::JoinSet;
use tracing::{error, info};

use svckit::errors::ClientError;
use crate::inserter::InsertRunStats;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InsertSummary {
    pub workers: usize,
    pub rows: u64,
    pub batches: u64,
}

/// Fans out independent insert workers and waits for every one of them.
pub struct WorkerCoordinator {
    concurrency: usize,
}

impl WorkerCoordinator {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Spawns `concurrency` workers built by `factory(worker_index)`.
    ///
    /// The first worker failure aborts the rest and is returned; there is no
    /// partial-success result.
    pub async fn run<F, Fut>(&self, factory: F) -> Result<InsertSummary, ClientError>
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = Result<InsertRunStats, ClientError>> + Send + 'static,
    {
        info!("Starting {} insert workers", self.concurrency);

        let mut join_set = JoinSet::new();
        for worker in 0..self.concurrency {
            join_set.spawn(factory(worker));
        }

        let mut summary = InsertSummary::default();
        while let Some(result) = join_set.join_next().await {
            let failure = match result {
                Ok(Ok(stats)) => {
                    summary.workers += 1;
                    summary.rows += stats.count;
                    summary.batches += stats.batches;
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => ClientError::WorkerError(format!("Task join failed: {}", e)),
            };

            error!("Insert worker failed: {}", failure);
            join_set.abort_all();
            while join_set.join_next().await.is_some() {}
            return Err(failure);
        }

        info!(
            "All {} insert workers finished: rows={} batches={}",
            summary.workers, summary.rows, summary.batches
        );
        Ok(summary)
    }
}
