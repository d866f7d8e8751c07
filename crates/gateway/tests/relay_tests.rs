//! Scenario tests for the inbox relay: registry semantics, fan-out targeting,
//! echo suppression, and lifecycle hygiene, exercised through the crate's
//! public API the way the session handler drives it.

use huddle_gateway::{Broadcaster, ConnectionId, RelayRegistry};
use tokio::sync::mpsc;

struct Client {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Client {
    fn connect(registry: &RelayRegistry, team: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);
        registry.set_subscription(id, team);
        Self { id, rx }
    }

    fn connect_unsubscribed(registry: &RelayRegistry) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);
        Self { id, rx }
    }

    fn received(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[tokio::test]
async fn broadcast_reaches_teammates_and_nobody_else() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut a = Client::connect(&registry, "t1");
    let mut b = Client::connect(&registry, "t1");
    let mut x = Client::connect(&registry, "t2");

    broadcaster.broadcast("t1", r#"{"body":"hello t1"}"#, Some(a.id));

    assert!(a.received().is_empty(), "originator must not hear its own message");
    assert_eq!(b.received(), vec![r#"{"body":"hello t1"}"#.to_string()]);
    assert!(x.received().is_empty(), "other teams must hear nothing");
}

#[tokio::test]
async fn closed_connection_never_receives_later_broadcasts() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut b = Client::connect(&registry, "t1");
    let c = Client::connect(&registry, "t1");

    registry.unregister(c.id);
    let delivered = broadcaster.broadcast("t1", "after-close", None);

    assert_eq!(delivered, 1);
    assert_eq!(b.received(), vec!["after-close".to_string()]);

    let mut c = c;
    assert!(c.received().is_empty());
}

#[tokio::test]
async fn resubscription_moves_eligibility_between_teams() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut mover = Client::connect(&registry, "t1");
    let mut t1_peer = Client::connect(&registry, "t1");
    let mut t2_peer = Client::connect(&registry, "t2");

    registry.set_subscription(mover.id, "t2");

    broadcaster.broadcast("t1", "for-t1", None);
    broadcaster.broadcast("t2", "for-t2", None);

    assert_eq!(mover.received(), vec!["for-t2".to_string()]);
    assert_eq!(t1_peer.received(), vec!["for-t1".to_string()]);
    assert_eq!(t2_peer.received(), vec!["for-t2".to_string()]);
}

#[tokio::test]
async fn duplicate_subscription_does_not_duplicate_delivery() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut b = Client::connect(&registry, "t1");
    registry.set_subscription(b.id, "t1");
    registry.set_subscription(b.id, "t1");

    broadcaster.broadcast("t1", "once", None);

    assert_eq!(b.received(), vec!["once".to_string()]);
}

#[tokio::test]
async fn dead_target_is_skipped_without_failing_the_broadcast() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let dead = Client::connect(&registry, "t1");
    let mut alive = Client::connect(&registry, "t1");

    drop(dead.rx);

    let delivered = broadcaster.broadcast("t1", "still-delivered", None);

    assert_eq!(delivered, 1);
    assert_eq!(alive.received(), vec!["still-delivered".to_string()]);
    assert_eq!(registry.connection_count(), 1, "dead connection must be reaped");
}

#[tokio::test]
async fn unsubscribed_connection_stays_silent() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut lurker = Client::connect_unsubscribed(&registry);
    let mut member = Client::connect(&registry, "t1");

    broadcaster.broadcast("t1", "team-only", None);

    assert!(lurker.received().is_empty());
    assert_eq!(member.received(), vec!["team-only".to_string()]);
}

#[tokio::test]
async fn connection_lifecycles_do_not_leak_registry_entries() {
    let registry = RelayRegistry::new();

    for round in 0..8 {
        let team = format!("team-{round}");
        let clients: Vec<Client> = (0..4).map(|_| Client::connect(&registry, &team)).collect();
        assert_eq!(registry.connection_count(), 4);

        for client in clients {
            registry.unregister(client.id);
        }
        assert_eq!(registry.connection_count(), 0);
    }
}

#[tokio::test]
async fn concurrent_churn_never_corrupts_fanout() {
    let registry = RelayRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());

    let mut steady = Client::connect(&registry, "t1");

    // Connections churn on other tasks while broadcasts are in flight; the
    // steady subscriber must see every frame exactly once, in order.
    let churn = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let (tx, rx) = mpsc::unbounded_channel();
                let id = registry.register(tx);
                registry.set_subscription(id, "t1");
                drop(rx);
                registry.unregister(id);
                tokio::task::yield_now().await;
            }
        })
    };

    let sender = {
        let broadcaster = broadcaster.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                broadcaster.broadcast("t1", &format!("frame-{i}"), None);
                tokio::task::yield_now().await;
            }
        })
    };

    churn.await.unwrap();
    sender.await.unwrap();

    let frames = steady.received();
    assert_eq!(frames.len(), 100);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame, &format!("frame-{i}"));
    }
    assert_eq!(registry.connection_count(), 1);
}
