//! Best-effort fan-out of message frames to team subscribers.

use tracing::{debug, warn};

use super::registry::{ConnectionId, RelayRegistry};

/// Delivers frames to every connection subscribed to a team, except the one
/// that originated them. Delivery is best-effort: the durable copy already
/// exists, so a recipient lost here catches up through a history fetch.
#[derive(Clone)]
pub struct Broadcaster {
    registry: RelayRegistry,
}

impl Broadcaster {
    pub fn new(registry: RelayRegistry) -> Self {
        Self { registry }
    }

    /// Fan `frame` out to all of `team`'s subscribers except `origin`.
    /// Returns how many connections the frame was handed to.
    ///
    /// A target whose channel is closed is skipped and unregistered; it never
    /// aborts delivery to the remaining targets. Frames are handed to each
    /// connection's outbound channel in call order, so per-team delivery
    /// order matches the order broadcasts are issued — which the REST layer
    /// ties to message-store insert completion.
    pub fn broadcast(&self, team: &str, frame: &str, origin: Option<ConnectionId>) -> usize {
        let targets = self.registry.subscribers_of(team);
        let mut delivered = 0;

        for (id, sender) in targets {
            if Some(id) == origin {
                continue;
            }

            if sender.send(frame.to_string()).is_err() {
                // Receiver gone: the connection died without unregistering
                // yet. Clean it up and keep going.
                warn!(connection = id, team, "dropping dead inbox connection");
                self.registry.unregister(id);
                continue;
            }

            delivered += 1;
        }

        debug!(team, delivered, "broadcast inbox frame");
        delivered
    }
}
