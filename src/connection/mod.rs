pub mod coordinator;
pub mod monitor;
pub mod resolver;

pub use coordinator::{
    ConnectionCoordinator,
    ConnectionState,
};
pub use monitor::{
    NetworkFeed,
    NetworkMonitor,
};
pub use resolver::EndpointResolver;

/// User-feedback notifications from the connection layer. Drained by the UI
/// through [`ConnectionCoordinator::poll_events`]; connection-class failures
/// warrant a non-auto-dismissing alert, establishment a transient toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// First successful bridge call since startup.
    BridgeEstablished,
    /// Device has no network; first failure of this down episode.
    Offline,
    /// Network is up but no candidate endpoint answered the liveness probe;
    /// first failure of this down episode.
    BridgeUnreachable,
}
