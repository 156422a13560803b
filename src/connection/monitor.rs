use tokio::sync::watch;

/// Platform-side half of the connectivity monitor. The OS network-status
/// provider is the only writer: it publishes the connected flag on startup
/// and on every transition.
pub struct NetworkFeed {
    tx: watch::Sender<bool>,
}

impl NetworkFeed {
    pub fn publish(&self, is_connected: bool) {
        self.tx.send_replace(is_connected);
    }
}

/// Process-wide "last known online" flag. `is_online` is a single
/// point-in-time read with no retry; `watch` re-publishes every transition
/// push-style, so nothing polls.
#[derive(Clone)]
pub struct NetworkMonitor {
    rx: watch::Receiver<bool>,
}

impl NetworkMonitor {
    /// Starts offline until the platform publishes its first reading.
    pub fn channel() -> (NetworkFeed, NetworkMonitor) {
        let (tx, rx) = watch::channel(false);
        (NetworkFeed { tx }, NetworkMonitor { rx })
    }

    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}
