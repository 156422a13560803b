use std::{
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

use tokio::{
    sync::{
        mpsc::{
            self,
            UnboundedReceiver,
            UnboundedSender,
        },
        Mutex as AsyncMutex,
    },
    task::JoinHandle,
    time::Instant,
};

use crate::connection::{
    monitor::NetworkMonitor,
    resolver::EndpointResolver,
    ConnectionEvent,
};

/// How long a connectivity check stays warm before the next caller forces a
/// re-check. The bridge may restart under a different loopback alias, so
/// resolution is never trusted for longer than this.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// The single "are we usable right now" answer callers gate data operations
/// on. Offline and bridge-unavailable never propagate as errors; they are
/// these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_online: bool,
    pub has_bridge: bool,
}

impl ConnectionState {
    pub fn usable(&self) -> bool {
        self.is_online && self.has_bridge
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DownKind {
    Offline,
    BridgeUnreachable,
}

struct Cached {
    state: ConnectionState,
    endpoint: Option<String>,
    checked_at: Instant,
}

struct CacheSlot {
    entry: Option<Cached>,
    /// Bumped on every invalidation; a check that started under an older
    /// epoch is superseded and must not write its result back.
    epoch: u64,
    /// Failure kind already surfaced this down episode, so TTL refreshes
    /// don't re-nag. Cleared when the state comes back healthy.
    announced: Option<DownKind>,
}

/// Memoizes connectivity/bridge checks, collapses concurrent callers onto
/// one in-flight probe sequence, and invalidates on network transitions.
///
/// Cold -> check -> Warm; Warm returns the cache without I/O; TTL expiry or a
/// connectivity transition makes it Stale; Stale runs the full check again.
pub struct ConnectionCoordinator {
    monitor: NetworkMonitor,
    resolver: EndpointResolver,
    ttl: Duration,
    cache: Mutex<CacheSlot>,
    check_lock: AsyncMutex<()>,
    event_sender: UnboundedSender<ConnectionEvent>,
    event_receiver: Mutex<UnboundedReceiver<ConnectionEvent>>,
}

impl ConnectionCoordinator {
    pub fn new(monitor: NetworkMonitor, resolver: EndpointResolver) -> Self {
        Self::with_ttl(monitor, resolver, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(monitor: NetworkMonitor, resolver: EndpointResolver, ttl: Duration) -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            monitor,
            resolver,
            ttl,
            cache: Mutex::new(CacheSlot { entry: None, epoch: 0, announced: None }),
            check_lock: AsyncMutex::new(()),
            event_sender,
            event_receiver: Mutex::new(event_receiver),
        }
    }

    /// Cached state while warm; otherwise one full check (connectivity first,
    /// then the endpoint probe sequence) shared by every concurrent caller.
    pub async fn ensure_usable(&self) -> ConnectionState {
        if let Some(state) = self.fresh() {
            return state;
        }

        let _checking = self.check_lock.lock().await;

        // A caller that was queued behind the in-flight check finds the
        // cache already refreshed and returns the same result.
        if let Some(state) = self.fresh() {
            return state;
        }

        let epoch = self.cache.lock().unwrap().epoch;
        let (state, endpoint) = self.run_check().await;
        self.store(epoch, state, endpoint);

        state
    }

    /// Resolved bridge base URL, while the cache is warm and the bridge was
    /// reachable.
    pub fn endpoint(&self) -> Option<String> {
        let slot = self.cache.lock().unwrap();
        let entry = slot.entry.as_ref()?;
        if entry.checked_at.elapsed() < self.ttl {
            entry.endpoint.clone()
        } else {
            None
        }
    }

    /// Forces the next `ensure_usable` to run a fresh check; called on every
    /// connectivity transition. An in-flight check becomes superseded: its
    /// result is still returned to its callers but not written back.
    pub fn invalidate(&self) {
        let mut slot = self.cache.lock().unwrap();
        slot.entry = None;
        slot.epoch += 1;
    }

    /// Invalidates on every connectivity transition the monitor re-publishes.
    pub fn spawn_network_watcher(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.monitor.watch();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                self.invalidate();
            }
        })
    }

    /// Pending user-feedback notifications, drained.
    pub fn poll_events(&self) -> Vec<ConnectionEvent> {
        let mut receiver = self.event_receiver.lock().unwrap();
        let mut events = Vec::new();

        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }

        events
    }

    /// Sender half for wiring other emitters (the bridge client's
    /// establishment latch) into the same stream.
    pub fn event_sender(&self) -> UnboundedSender<ConnectionEvent> {
        self.event_sender.clone()
    }

    fn fresh(&self) -> Option<ConnectionState> {
        let slot = self.cache.lock().unwrap();
        let entry = slot.entry.as_ref()?;
        if entry.checked_at.elapsed() < self.ttl {
            Some(entry.state)
        } else {
            None
        }
    }

    async fn run_check(&self) -> (ConnectionState, Option<String>) {
        // Offline short-circuits: no bridge probe without a network.
        if !self.monitor.is_online() {
            return (ConnectionState { is_online: false, has_bridge: false }, None);
        }

        match self.resolver.resolve().await {
            Some(endpoint) => {
                (ConnectionState { is_online: true, has_bridge: true }, Some(endpoint))
            }
            None => (ConnectionState { is_online: true, has_bridge: false }, None),
        }
    }

    fn store(&self, epoch: u64, state: ConnectionState, endpoint: Option<String>) {
        let mut slot = self.cache.lock().unwrap();

        if slot.epoch != epoch {
            // Superseded by an invalidation while the check ran.
            return;
        }

        slot.entry = Some(Cached { state, endpoint, checked_at: Instant::now() });

        if state.usable() {
            slot.announced = None;
            return;
        }

        let kind =
            if state.is_online { DownKind::BridgeUnreachable } else { DownKind::Offline };
        if slot.announced != Some(kind) {
            slot.announced = Some(kind);
            let event = match kind {
                DownKind::Offline => ConnectionEvent::Offline,
                DownKind::BridgeUnreachable => ConnectionEvent::BridgeUnreachable,
            };
            let _ = self.event_sender.send(event);
        }
    }
}
