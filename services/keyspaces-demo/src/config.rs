use std::time::Duration;
use anyhow::Result;
use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use svckit::config::{duration_str, DatabaseConfig, RetryConfig};
use svckit::types::ConsistencyLevel;
use tracing::info;

const FALLBACK_REGION: &str = "us-east-1";

/// Flat settings so every key maps 1:1 onto an unprefixed environment variable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub aws_region: Option<String>,
    pub aws_default_region: Option<String>,
    pub endpoint: Option<String>,

    pub query1: String,
    pub query2: String,
    pub query3: String,
    pub query3_print: bool,

    pub insert_concurrency: usize,
    pub insert_limit: u64,
    #[serde(with = "duration_str")]
    pub insert_duration: Duration,
    pub insert_table: String,
    pub insert_batch_size: usize,

    #[serde(with = "duration_str")]
    pub retry_min_backoff: Duration,
    #[serde(with = "duration_str")]
    pub retry_max_backoff: Duration,
    pub retry_max_attempts: u32,

    pub consistency: ConsistencyLevel,
    pub cql_username: Option<String>,
    pub cql_password: Option<String>,
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let database = DatabaseConfig::default();
        let retry = RetryConfig::default();
        Self {
            aws_region: None,
            aws_default_region: None,
            endpoint: None,
            query1: "select * from system.peers".to_string(),
            query2: "SELECT keyspace_name, table_name FROM system_schema.tables;".to_string(),
            query3: "select * from demo.demo1".to_string(),
            query3_print: false,
            insert_concurrency: 1,
            insert_limit: 1,
            insert_duration: Duration::from_secs(1),
            insert_table: "demo.demo1".to_string(),
            insert_batch_size: 30,
            retry_min_backoff: retry.min_backoff,
            retry_max_backoff: retry.max_backoff,
            retry_max_attempts: retry.max_attempts,
            consistency: database.consistency,
            cql_username: None,
            cql_password: None,
            connect_timeout: database.connection_timeout,
            request_timeout: database.request_timeout,
        }
    }
}

impl DemoConfig {
    /// First non-empty of `AWS_REGION`, `AWS_DEFAULT_REGION`, then the fallback.
    pub fn region(&self) -> String {
        [&self.aws_region, &self.aws_default_region]
            .into_iter()
            .flatten()
            .find(|r| !r.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_REGION.to_string())
    }

    pub fn resolved_endpoint(&self) -> String {
        match self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => endpoint.to_string(),
            None => format!("cassandra.{}.amazonaws.com:9142", self.region()),
        }
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            endpoint: self.resolved_endpoint(),
            region: self.region(),
            username: self.cql_username.clone(),
            password: self.cql_password.clone(),
            consistency: self.consistency,
            connection_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            min_backoff: self.retry_min_backoff,
            max_backoff: self.retry_max_backoff,
            max_attempts: self.retry_max_attempts,
        }
    }

    pub fn log_resolved(&self) {
        info!("region='{}'", self.region());
        info!("endpoint='{}'", self.resolved_endpoint());
        info!("QUERY1='{}'", self.query1);
        info!("QUERY2='{}'", self.query2);
        info!("QUERY3='{}'", self.query3);
        info!("QUERY3_PRINT={}", self.query3_print);
        info!("INSERT_CONCURRENCY={}", self.insert_concurrency);
        info!("INSERT_LIMIT={}", self.insert_limit);
        info!("INSERT_DURATION={:?}", self.insert_duration);
        info!("INSERT_TABLE='{}'", self.insert_table);
        info!("INSERT_BATCH_SIZE={}", self.insert_batch_size);
        info!(
            "RETRY min={:?} max={:?} attempts={}",
            self.retry_min_backoff, self.retry_max_backoff, self.retry_max_attempts
        );
        info!("CONSISTENCY={}", self.consistency);
        info!("CQL_USERNAME set={}", self.cql_username.is_some());
    }
}

pub fn load_config(path: &str) -> Result<DemoConfig> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().try_parsing(true));
    from_builder(builder)
}

fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<DemoConfig> {
    let config = builder.build()?;
    let demo: DemoConfig = config.try_deserialize()?;

    if demo.insert_batch_size == 0 {
        anyhow::bail!("INSERT_BATCH_SIZE must be at least 1");
    }
    Ok(demo)
}
