use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// A single column value as delivered by the session, rendered through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Blob(Vec<u8>),
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Inet(IpAddr),
    List(Vec<ColumnValue>),
    Map(Vec<(ColumnValue, ColumnValue)>),
    /// Kinds without a dedicated variant, already rendered by the driver.
    Other(String),
    Null,
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Text(s) | ColumnValue::Other(s) => f.write_str(s),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::BigInt(v) => write!(f, "{}", v),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Double(v) => write!(f, "{}", v),
            ColumnValue::Boolean(v) => write!(f, "{}", v),
            ColumnValue::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            ColumnValue::Uuid(id) => write!(f, "{}", id),
            ColumnValue::Timestamp(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => write!(f, "{}", ms),
            },
            ColumnValue::Inet(ip) => write!(f, "{}", ip),
            ColumnValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            ColumnValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            ColumnValue::Null => f.write_str("null"),
        }
    }
}

/// Column metadata returned once per result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub type_descriptor: String,
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
        };
        f.write_str(name)
    }
}

/// One statement inside a batch. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    statement: String,
    arguments: Vec<ColumnValue>,
    idempotent: bool,
}

impl BatchEntry {
    pub fn new(statement: impl Into<String>, arguments: Vec<ColumnValue>, idempotent: bool) -> Self {
        Self {
            statement: statement.into(),
            arguments,
            idempotent,
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn arguments(&self) -> &[ColumnValue] {
        &self.arguments
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }
}

/// Entries waiting to be flushed as one unlogged batch.
#[derive(Debug, Clone)]
pub struct BatchJob {
    entries: Vec<BatchEntry>,
    capacity: usize,
}

impl BatchJob {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// A batch may be resubmitted only if every entry is.
    pub fn is_idempotent(&self) -> bool {
        self.entries.iter().all(BatchEntry::is_idempotent)
    }
}

/// Produced per node when a session is built, consumed only by a `ConnectObserver`.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub host_id: Option<Uuid>,
    pub address: String,
    pub port: u16,
    pub error: Option<String>,
    /// Time taken to build the session, shared by every event from one build.
    pub latency: Duration,
}
