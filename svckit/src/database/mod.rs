pub mod connection;
pub mod observer;
pub mod query_builder;
pub mod retry;
pub mod scylla;

pub use connection::{DatabaseConnection, QueryRows, RowStream};
pub use observer::{ConnectObserver, TracingConnectObserver};
pub use query_builder::QueryBuilder;
pub use retry::{
    execute_with_retry, nap_time, nap_time_with_jitter, ExponentialBackoffRetryPolicy,
    ImmediateRetryPolicy, RetryPolicy, RetryState, RetryType,
};
pub use scylla::ScyllaConnection;
