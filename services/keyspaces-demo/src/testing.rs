//! In-memory session and id source for unit tests.

use std::time::Duration;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use svckit::{
    database::{DatabaseConnection, QueryRows},
    errors::ClientError,
    ids::IdGenerator,
    types::{BatchJob, ColumnSpec, ColumnValue},
};

/// Records every successfully executed batch and serves a canned result set.
#[derive(Default)]
pub struct FakeConnection {
    batches: Mutex<Vec<BatchJob>>,
    calls: Mutex<usize>,
    batch_latency: Option<Duration>,
    fail_batch_at: Option<usize>,
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<ColumnValue>>,
    fail_row_at: Option<usize>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_latency(mut self, latency: Duration) -> Self {
        self.batch_latency = Some(latency);
        self
    }

    /// Fails the batch call with this zero-based index.
    pub fn failing_batch_at(mut self, index: usize) -> Self {
        self.fail_batch_at = Some(index);
        self
    }

    pub fn with_rows(mut self, columns: Vec<ColumnSpec>, rows: Vec<Vec<ColumnValue>>) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Yields an iteration error in place of the row with this zero-based index.
    pub fn failing_row_at(mut self, index: usize) -> Self {
        self.fail_row_at = Some(index);
        self
    }

    pub fn batches(&self) -> Vec<BatchJob> {
        self.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(BatchJob::len).collect()
    }

    pub fn total_entries(&self) -> u64 {
        self.batches.lock().iter().map(|b| b.len() as u64).sum()
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for FakeConnection {
    async fn execute_batch(&self, batch: &BatchJob) -> Result<(), ClientError> {
        let index = {
            let mut calls = self.calls.lock();
            let index = *calls;
            *calls += 1;
            index
        };

        if let Some(latency) = self.batch_latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_batch_at == Some(index) {
            return Err(ClientError::BatchError("write timeout".to_string()));
        }

        self.batches.lock().push(batch.clone());
        Ok(())
    }

    async fn query_iter(&self, _statement: &str) -> Result<QueryRows, ClientError> {
        let fail_row_at = self.fail_row_at;
        let rows: Vec<Result<Vec<ColumnValue>, ClientError>> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if fail_row_at == Some(i) {
                    Err(ClientError::RowIterationError("page fetch failed".to_string()))
                } else {
                    Ok(row.clone())
                }
            })
            .collect();

        Ok(QueryRows::new(self.columns.clone(), stream::iter(rows).boxed()))
    }
}

/// Deterministic ids `id-0`, `id-1`, ... with an optional failure point.
#[derive(Default)]
pub struct SequentialIds {
    next: u64,
    fail_after: Option<u64>,
}

impl SequentialIds {
    pub fn failing_after(count: u64) -> Self {
        Self {
            next: 0,
            fail_after: Some(count),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Result<String, ClientError> {
        if self.fail_after == Some(self.next) {
            return Err(ClientError::IdGenerationError("entropy exhausted".to_string()));
        }
        let id = format!("id-{}", self.next);
        self.next += 1;
        Ok(id)
    }
}
