use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Batch execute error: {0}")]
    BatchError(String),

    #[error("Identifier generation error: {0}")]
    IdGenerationError(String),

    #[error("Row iteration error: {0}")]
    RowIterationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Worker error: {0}")]
    WorkerError(String),

    #[error("Output error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<scylla::transport::errors::QueryError> for ClientError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        ClientError::DatabaseError(err.to_string())
    }
}

impl From<scylla::transport::errors::NewSessionError> for ClientError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        ClientError::ConnectionError(err.to_string())
    }
}
