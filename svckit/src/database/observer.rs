use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info, warn};

use crate::types::ConnectionEvent;

/// Passive hook fired when a session is built.
///
/// A successful build yields one event per discovered node, all carrying the
/// session setup time as `latency`. A failed build yields one event for the
/// contact point. Reconnects made later by the driver are not reported.
pub trait ConnectObserver: Send + Sync {
    fn observe_connect(&self, event: &ConnectionEvent);
}

/// Logs one line per connection attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConnectObserver;

impl ConnectObserver for TracingConnectObserver {
    fn observe_connect(&self, event: &ConnectionEvent) {
        let host_id = event
            .host_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());

        match &event.error {
            None => info!(
                host_id = %host_id,
                address = %event.address,
                port = event.port,
                setup = ?event.latency,
                "Connected to host"
            ),
            Some(err) => warn!(
                host_id = %host_id,
                address = %event.address,
                port = event.port,
                setup = ?event.latency,
                error = %err,
                "Failed to connect to host"
            ),
        }
    }
}

/// Invokes `observer`, containing any panic so it cannot affect the connection outcome.
pub fn notify(observer: &dyn ConnectObserver, event: &ConnectionEvent) {
    let outcome = catch_unwind(AssertUnwindSafe(|| observer.observe_connect(event)));
    if outcome.is_err() {
        error!(
            "Connection observer panicked for {}:{}; ignoring",
            event.address, event.port
        );
    }
}
