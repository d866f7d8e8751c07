//! Shared application state for the gateway

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use huddle_auth::Authenticator;
use huddle_database::{AccountRepository, MessageRepository, TaskRepository, TeamRepository};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::relay::RelayRegistry;

const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Shared application state containing the repositories, the authenticator,
/// and the relay registry.
#[derive(Clone)]
pub struct GatewayState {
    /// Database connection pool
    pub pool: SqlitePool,
    /// Authentication service
    pub authenticator: Authenticator,
    /// Account lookups
    pub accounts: Arc<AccountRepository>,
    /// Team and membership data access
    pub teams: Arc<TeamRepository>,
    /// Task and assignment data access
    pub tasks: Arc<TaskRepository>,
    /// Inbox message store
    pub messages: Arc<MessageRepository>,
    /// Live inbox connections
    pub relay: RelayRegistry,
    /// Pending OAuth CSRF states
    pub oauth_state: OAuthStateStore,
}

impl GatewayState {
    pub fn new(pool: SqlitePool, authenticator: Authenticator) -> Self {
        Self {
            accounts: Arc::new(AccountRepository::new(pool.clone())),
            teams: Arc::new(TeamRepository::new(pool.clone())),
            tasks: Arc::new(TaskRepository::new(pool.clone())),
            messages: Arc::new(MessageRepository::new(pool.clone())),
            relay: RelayRegistry::new(),
            oauth_state: OAuthStateStore::new(OAUTH_STATE_TTL),
            pool,
            authenticator,
        }
    }
}

/// Single-use OAuth states with a TTL, pruned on every touch.
#[derive(Clone)]
pub struct OAuthStateStore {
    inner: Arc<Mutex<HashMap<String, Instant>>>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn issue(&self) -> String {
        let state = Self::random_state();
        self.store(state.clone()).await;
        state
    }

    pub async fn store(&self, state: String) {
        let mut guard = self.inner.lock().await;
        Self::prune(&mut guard, self.ttl);
        guard.insert(state, Instant::now());
    }

    pub async fn consume(&self, state: &str) -> bool {
        let mut guard = self.inner.lock().await;
        Self::prune(&mut guard, self.ttl);
        guard.remove(state).is_some()
    }

    fn random_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    fn prune(map: &mut HashMap<String, Instant>, ttl: Duration) {
        let now = Instant::now();
        map.retain(|_, created| now.duration_since(*created) <= ttl);
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(OAUTH_STATE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn oauth_state_issue_and_consume_once() {
        let store = OAuthStateStore::new(Duration::from_secs(60));
        let state = store.issue().await;

        assert_eq!(state.len(), 32);
        assert!(store.consume(&state).await);
        assert!(!store.consume(&state).await);
    }

    #[tokio::test]
    async fn oauth_state_entry_expires_after_ttl() {
        let store = OAuthStateStore::new(Duration::from_millis(10));
        let state = "expired-state".to_string();
        store.store(state.clone()).await;

        sleep(Duration::from_millis(25)).await;

        assert!(!store.consume(&state).await);
    }
}
