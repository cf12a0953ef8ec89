use futures::stream::BoxStream;

use crate::errors::ClientError;
use crate::types::{BatchJob, ColumnSpec, ColumnValue};

pub type RowStream = BoxStream<'static, Result<Vec<ColumnValue>, ClientError>>;

/// Result of a read: column metadata plus a lazily fetched row stream.
pub struct QueryRows {
    pub columns: Vec<ColumnSpec>,
    pub rows: RowStream,
}

impl QueryRows {
    pub fn new(columns: Vec<ColumnSpec>, rows: RowStream) -> Self {
        Self { columns, rows }
    }
}

/// Session seam shared by every worker. Implementations must be safe for
/// concurrent use and apply their own retry policy internally.
#[async_trait::async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Executes every entry of `batch` as one unlogged batch. All-or-nothing.
    async fn execute_batch(&self, batch: &BatchJob) -> Result<(), ClientError>;

    async fn query_iter(&self, statement: &str) -> Result<QueryRows, ClientError>;
}
