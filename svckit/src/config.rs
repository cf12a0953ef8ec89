use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::ConsistencyLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Contact point as `host:port`.
    pub endpoint: String,
    pub region: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub consistency: ConsistencyLevel,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9042".to_string(),
            region: "us-east-1".to_string(),
            username: None,
            password: None,
            consistency: ConsistencyLevel::LocalQuorum,
            connection_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(12),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

/// Serde adapter for human-readable durations such as `"1s"` or `"250ms"`.
pub mod duration_str {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(with = "duration_str")]
        value: Duration,
    }

    fn parse(raw: &str) -> Result<Duration, String> {
        let wrapper = serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
            [("value", raw)].into_iter(),
        );
        Wrapper::deserialize(wrapper)
            .map(|w| w.value)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_duration_str_accepts_humantime() {
        assert_eq!(parse("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse("1m 30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_duration_str_rejects_garbage() {
        assert!(parse("soon").is_err());
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.min_backoff, Duration::from_millis(100));
        assert_eq!(retry.max_backoff, Duration::from_secs(10));
        assert_eq!(retry.max_attempts, 3);
    }
}
