use std::sync::Arc;
use std::time::Instant;
use futures::StreamExt;
use scylla::batch::{Batch, BatchType};
use scylla::frame::response::result::{ColumnType, CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::query::Query;
use scylla::statement::Consistency;
use scylla::transport::execution_profile::ExecutionProfile;
use scylla::transport::retry_policy::FallthroughRetryPolicy;
use scylla::{Session, SessionBuilder};
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::errors::ClientError;
use crate::types::{BatchJob, ColumnSpec, ColumnValue, ConnectionEvent, ConsistencyLevel};
use super::connection::{DatabaseConnection, QueryRows};
use super::observer::{notify, ConnectObserver};
use super::retry::{execute_with_retry, RetryPolicy};

/// Scylla-driver session with the retry policy and connection observer applied internally.
pub struct ScyllaConnection {
    session: Arc<Session>,
    retry_policy: Arc<dyn RetryPolicy>,
}

impl ScyllaConnection {
    pub async fn new(
        config: &DatabaseConfig,
        retry_policy: Arc<dyn RetryPolicy>,
        observer: Arc<dyn ConnectObserver>,
    ) -> Result<Self, ClientError> {
        info!("Connecting to {} (region {})", config.endpoint, config.region);

        // Resubmission is owned by `retry_policy`; the driver must not retry on its own.
        let profile = ExecutionProfile::builder()
            .consistency(to_consistency(config.consistency))
            .request_timeout(Some(config.request_timeout))
            .retry_policy(Arc::new(FallthroughRetryPolicy::new()))
            .build();

        let mut session_builder = SessionBuilder::new()
            .known_node(&config.endpoint)
            .connection_timeout(config.connection_timeout)
            .default_execution_profile_handle(profile.into_handle());

        if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
            session_builder = session_builder.user(username, password);
        }

        let start = Instant::now();
        let session = match session_builder.build().await {
            Ok(session) => session,
            Err(e) => {
                let (address, port) = split_endpoint(&config.endpoint);
                notify(
                    observer.as_ref(),
                    &ConnectionEvent {
                        host_id: None,
                        address,
                        port,
                        error: Some(e.to_string()),
                        latency: start.elapsed(),
                    },
                );
                error!("Failed to connect to {}: {}", config.endpoint, e);
                return Err(ClientError::ConnectionError(format!(
                    "Failed to connect to {}: {}",
                    config.endpoint, e
                )));
            }
        };
        let setup = start.elapsed();

        let cluster = session.get_cluster_data();
        for node in cluster.get_nodes_info() {
            notify(
                observer.as_ref(),
                &ConnectionEvent {
                    host_id: Some(node.host_id),
                    address: node.address.ip().to_string(),
                    port: node.address.port(),
                    error: None,
                    latency: setup,
                },
            );
        }

        info!("Session established with consistency {}", config.consistency);

        Ok(Self {
            session: Arc::new(session),
            retry_policy,
        })
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for ScyllaConnection {
    async fn execute_batch(&self, job: &BatchJob) -> Result<(), ClientError> {
        if job.is_empty() {
            return Ok(());
        }

        let mut batch = Batch::new(BatchType::Unlogged);
        for entry in job.entries() {
            batch.append_statement(entry.statement());
        }
        let idempotent = job.is_idempotent();
        batch.set_is_idempotent(idempotent);

        let values: Vec<Vec<Option<CqlValue>>> = job
            .entries()
            .iter()
            .map(|entry| entry.arguments().iter().map(to_cql_value).collect())
            .collect();

        let session = &self.session;
        let batch = &batch;
        let values = &values;
        execute_with_retry(self.retry_policy.as_ref(), idempotent, "batch", || async move {
            let prepared = session
                .prepare_batch(batch)
                .await
                .map_err(|e| ClientError::BatchError(format!("Failed to prepare batch: {}", e)))?;
            session
                .batch(&prepared, values)
                .await
                .map(|_| ())
                .map_err(|e| ClientError::BatchError(e.to_string()))
        })
        .await
    }

    async fn query_iter(&self, statement: &str) -> Result<QueryRows, ClientError> {
        let mut query = Query::new(statement);
        query.set_is_idempotent(true);

        let session = &self.session;
        let query = &query;
        let pager = execute_with_retry(self.retry_policy.as_ref(), true, "query", || async move {
            session
                .query_iter(query.clone(), ())
                .await
                .map_err(|e| ClientError::DatabaseError(format!("Query execution failed: {}", e)))
        })
        .await?;

        let columns = pager
            .column_specs()
            .iter()
            .map(|spec| ColumnSpec {
                name: spec.name().to_string(),
                type_descriptor: type_descriptor(spec.typ()),
            })
            .collect();

        let rows = pager
            .rows_stream::<Row>()
            .map_err(|e| ClientError::RowIterationError(e.to_string()))?
            .map(|row| {
                row.map(|row| {
                    row.columns
                        .into_iter()
                        .map(|value| value.map(from_cql_value).unwrap_or(ColumnValue::Null))
                        .collect()
                })
                .map_err(|e| ClientError::RowIterationError(e.to_string()))
            })
            .boxed();

        Ok(QueryRows::new(columns, rows))
    }
}

fn to_consistency(level: ConsistencyLevel) -> Consistency {
    match level {
        ConsistencyLevel::Any => Consistency::Any,
        ConsistencyLevel::One => Consistency::One,
        ConsistencyLevel::Two => Consistency::Two,
        ConsistencyLevel::Three => Consistency::Three,
        ConsistencyLevel::Quorum => Consistency::Quorum,
        ConsistencyLevel::All => Consistency::All,
        ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
        ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
        ConsistencyLevel::LocalOne => Consistency::LocalOne,
    }
}

fn split_endpoint(endpoint: &str) -> (String, u16) {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(9042)),
        None => (endpoint.to_string(), 9042),
    }
}

/// Renders a column type the way CQL spells it, e.g. `map<text, bigint>`.
fn type_descriptor(typ: &ColumnType) -> String {
    match typ {
        ColumnType::List(inner) => format!("list<{}>", type_descriptor(inner)),
        ColumnType::Set(inner) => format!("set<{}>", type_descriptor(inner)),
        ColumnType::Map(key, value) => {
            format!("map<{}, {}>", type_descriptor(key), type_descriptor(value))
        }
        ColumnType::Tuple(items) => format!(
            "tuple<{}>",
            items.iter().map(type_descriptor).collect::<Vec<_>>().join(", ")
        ),
        ColumnType::UserDefinedType { keyspace, type_name, .. } => {
            format!("{}.{}", keyspace, type_name)
        }
        // Class names are case-sensitive.
        ColumnType::Custom(class) => format!("'{}'", class),
        native => format!("{:?}", native).to_lowercase(),
    }
}

fn from_cql_value(value: CqlValue) -> ColumnValue {
    match value {
        CqlValue::Ascii(s) | CqlValue::Text(s) => ColumnValue::Text(s),
        CqlValue::Boolean(b) => ColumnValue::Boolean(b),
        CqlValue::Blob(bytes) => ColumnValue::Blob(bytes),
        CqlValue::TinyInt(v) => ColumnValue::Int(v.into()),
        CqlValue::SmallInt(v) => ColumnValue::Int(v.into()),
        CqlValue::Int(v) => ColumnValue::Int(v),
        CqlValue::BigInt(v) => ColumnValue::BigInt(v),
        CqlValue::Counter(c) => ColumnValue::BigInt(c.0),
        CqlValue::Float(v) => ColumnValue::Float(v),
        CqlValue::Double(v) => ColumnValue::Double(v),
        CqlValue::Uuid(id) => ColumnValue::Uuid(id),
        CqlValue::Timeuuid(id) => ColumnValue::Uuid(id.into()),
        CqlValue::Timestamp(ts) => ColumnValue::Timestamp(ts.0),
        CqlValue::Inet(ip) => ColumnValue::Inet(ip),
        CqlValue::List(items) | CqlValue::Set(items) => {
            ColumnValue::List(items.into_iter().map(from_cql_value).collect())
        }
        CqlValue::Map(entries) => ColumnValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (from_cql_value(k), from_cql_value(v)))
                .collect(),
        ),
        CqlValue::Empty => ColumnValue::Null,
        other => ColumnValue::Other(format!("{:?}", other)),
    }
}

fn to_cql_value(value: &ColumnValue) -> Option<CqlValue> {
    let cql = match value {
        ColumnValue::Text(s) | ColumnValue::Other(s) => CqlValue::Text(s.clone()),
        ColumnValue::Int(v) => CqlValue::Int(*v),
        ColumnValue::BigInt(v) => CqlValue::BigInt(*v),
        ColumnValue::Float(v) => CqlValue::Float(*v),
        ColumnValue::Double(v) => CqlValue::Double(*v),
        ColumnValue::Boolean(v) => CqlValue::Boolean(*v),
        ColumnValue::Blob(bytes) => CqlValue::Blob(bytes.clone()),
        ColumnValue::Uuid(id) => CqlValue::Uuid(*id),
        ColumnValue::Timestamp(ms) => CqlValue::Timestamp(CqlTimestamp(*ms)),
        ColumnValue::Inet(ip) => CqlValue::Inet(*ip),
        ColumnValue::List(items) => CqlValue::List(items.iter().filter_map(to_cql_value).collect()),
        ColumnValue::Map(entries) => CqlValue::Map(
            entries
                .iter()
                .filter_map(|(k, v)| Some((to_cql_value(k)?, to_cql_value(v)?)))
                .collect(),
        ),
        ColumnValue::Null => return None,
    };
    Some(cql)
}
