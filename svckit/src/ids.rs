use std::time::{SystemTime, UNIX_EPOCH};
use uuid::{ContextV7, Timestamp, Uuid};

use crate::errors::ClientError;

/// Source of unique, time-sortable row identifiers.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> Result<String, ClientError>;
}

/// UUIDv7 generator: millisecond timestamp prefix, then a counter that keeps
/// ids from the same millisecond in generation order.
pub struct TimeOrderedIdGenerator {
    clock: fn() -> SystemTime,
    context: ContextV7,
}

impl TimeOrderedIdGenerator {
    pub fn new() -> Self {
        Self::with_clock(SystemTime::now)
    }

    pub fn with_clock(clock: fn() -> SystemTime) -> Self {
        Self {
            clock,
            context: ContextV7::new(),
        }
    }
}

impl Default for TimeOrderedIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for TimeOrderedIdGenerator {
    fn next_id(&mut self) -> Result<String, ClientError> {
        let since_epoch = (self.clock)()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClientError::IdGenerationError(format!("clock before Unix epoch: {}", e)))?;

        let ts = Timestamp::from_unix(
            &self.context,
            since_epoch.as_secs(),
            since_epoch.subsec_nanos(),
        );
        Ok(Uuid::new_v7(ts).to_string())
    }
}
