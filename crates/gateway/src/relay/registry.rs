//! Process-wide registry of live inbox connections.
//!
//! The registry is the only mutable state the relay owns. It is ephemeral:
//! nothing is persisted, and clients rebuild their view by reconnecting and
//! fetching history. The map is never exposed directly; every interaction
//! goes through the four operations below, so the in-memory implementation
//! could later be swapped for a shared broker without touching the
//! broadcaster or the session handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// Identifies one live connection for the lifetime of the process.
pub type ConnectionId = u64;

struct ConnectionEntry {
    /// The team this connection currently receives broadcasts for.
    /// At most one; subscribing again overwrites.
    team: Option<String>,
    sender: mpsc::UnboundedSender<String>,
}

#[derive(Clone)]
pub struct RelayRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, ConnectionEntry>>,
}

impl RelayRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                connections: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Add a connection with no subscription. The sender is the connection's
    /// outbound frame channel; dropping its receiver marks the connection
    /// dead for delivery purposes.
    pub fn register(&self, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.inner.connections.lock().expect("relay registry poisoned");
        connections.insert(id, ConnectionEntry { team: None, sender });
        id
    }

    /// Point the connection at a team, replacing any previous subscription.
    /// Idempotent; a no-op for unknown (already unregistered) connections.
    pub fn set_subscription(&self, id: ConnectionId, team: &str) {
        let mut connections = self.inner.connections.lock().expect("relay registry poisoned");
        if let Some(entry) = connections.get_mut(&id) {
            entry.team = Some(team.to_string());
        }
    }

    /// Remove a connection. Dropping the entry drops the registry's sender
    /// half, which lets the connection's writer task wind down.
    pub fn unregister(&self, id: ConnectionId) {
        let mut connections = self.inner.connections.lock().expect("relay registry poisoned");
        connections.remove(&id);
    }

    /// Snapshot of the connections currently subscribed to `team`. The lock
    /// is released before the snapshot is used, so concurrent registrations
    /// and removals can never corrupt an in-flight iteration — they are
    /// simply not observed by it.
    pub fn subscribers_of(&self, team: &str) -> Vec<(ConnectionId, mpsc::UnboundedSender<String>)> {
        let connections = self.inner.connections.lock().expect("relay registry poisoned");
        connections
            .iter()
            .filter(|(_, entry)| entry.team.as_deref() == Some(team))
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Number of registered connections, subscribed or not.
    pub fn connection_count(&self) -> usize {
        let connections = self.inner.connections.lock().expect("relay registry poisoned");
        connections.len()
    }

    /// The team a connection is currently subscribed to, if any.
    pub fn subscription_of(&self, id: ConnectionId) -> Option<String> {
        let connections = self.inner.connections.lock().expect("relay registry poisoned");
        connections.get(&id).and_then(|entry| entry.team.clone())
    }
}

impl Default for RelayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_with_channel(
        registry: &RelayRegistry,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register(tx), rx)
    }

    #[test]
    fn register_starts_unsubscribed() {
        let registry = RelayRegistry::new();
        let (id, _rx) = register_with_channel(&registry);

        assert_eq!(registry.subscription_of(id), None);
        assert!(registry.subscribers_of("t1").is_empty());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn set_subscription_is_idempotent() {
        let registry = RelayRegistry::new();
        let (id, _rx) = register_with_channel(&registry);

        registry.set_subscription(id, "t1");
        let once = registry.subscribers_of("t1");
        registry.set_subscription(id, "t1");
        let twice = registry.subscribers_of("t1");

        assert_eq!(once.len(), 1);
        assert_eq!(twice.len(), 1);
        assert_eq!(once[0].0, twice[0].0);
    }

    #[test]
    fn resubscription_swaps_teams_atomically() {
        let registry = RelayRegistry::new();
        let (id, _rx) = register_with_channel(&registry);

        registry.set_subscription(id, "t1");
        registry.set_subscription(id, "t2");

        // Never both, never neither.
        assert!(registry.subscribers_of("t1").is_empty());
        assert_eq!(registry.subscribers_of("t2").len(), 1);
        assert_eq!(registry.subscription_of(id).as_deref(), Some("t2"));
    }

    #[test]
    fn unregister_returns_registry_to_empty() {
        let registry = RelayRegistry::new();
        let mut ids = Vec::new();
        let mut receivers = Vec::new();

        for _ in 0..16 {
            let (id, rx) = register_with_channel(&registry);
            registry.set_subscription(id, "t1");
            ids.push(id);
            receivers.push(rx);
        }
        assert_eq!(registry.connection_count(), 16);

        for id in ids {
            registry.unregister(id);
        }

        // Leak check: every lifecycle ends with the registry back at zero.
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.subscribers_of("t1").is_empty());
    }

    #[test]
    fn unregister_unknown_connection_is_a_noop() {
        let registry = RelayRegistry::new();
        registry.unregister(42);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn set_subscription_after_unregister_is_ignored() {
        let registry = RelayRegistry::new();
        let (id, _rx) = register_with_channel(&registry);
        registry.unregister(id);

        registry.set_subscription(id, "t1");
        assert!(registry.subscribers_of("t1").is_empty());
        assert_eq!(registry.connection_count(), 0);
    }
}
