//! Per-connection lifecycle for the inbox relay.
//!
//! Each WebSocket runs an explicit little state machine: Connecting until a
//! team id is known, Subscribed while relaying, Closed when the peer goes
//! away. A connection that arrives without a team id stays registered but
//! never reaches Subscribed, so it receives nothing.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::broadcast::Broadcaster;
use super::registry::RelayRegistry;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    team_id: Option<String>,
}

/// Inbox WebSocket connection handler
pub async fn inbox_websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<InboxQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let registry = state.relay.clone();
    ws.on_upgrade(move |socket| handle_session(socket, registry, query.team_id))
}

#[derive(Debug)]
enum SessionState {
    Connecting,
    Subscribed { team: String },
    Closed,
}

/// Everything a text frame can turn out to be. The session handler matches
/// on this exhaustively instead of trusting payloads to be well-formed.
#[derive(Debug)]
enum InboundFrame {
    Chat,
    Empty,
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    body: String,
    // Author, timestamp, related-task reference and anything else ride along
    // untouched; the relay forwards the original frame verbatim.
    #[serde(flatten)]
    _extra: Map<String, Value>,
}

fn classify_frame(text: &str) -> InboundFrame {
    match serde_json::from_str::<ChatPayload>(text) {
        Ok(payload) if payload.body.trim().is_empty() => InboundFrame::Empty,
        Ok(_) => InboundFrame::Chat,
        Err(error) => InboundFrame::Malformed(error.to_string()),
    }
}

async fn handle_session(socket: WebSocket, registry: RelayRegistry, team_id: Option<String>) {
    let (mut ws_sender, mut receiver) = socket.split();

    // Outbound frames go through a channel drained by a writer task, so a
    // stuck or closed peer only ever stalls its own deliveries.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let broadcaster = Broadcaster::new(registry.clone());
    let connection = registry.register(out_tx);

    let mut session = match team_id.as_deref().map(str::trim) {
        Some(team) if !team.is_empty() => {
            registry.set_subscription(connection, team);
            info!(connection, team, "inbox connection subscribed");
            SessionState::Subscribed {
                team: team.to_string(),
            }
        }
        _ => {
            info!(connection, "inbox connection has no team id, staying unsubscribed");
            SessionState::Connecting
        }
    };

    while !matches!(session, SessionState::Closed) {
        let Some(message) = receiver.next().await else {
            session = SessionState::Closed;
            break;
        };

        match message {
            Ok(Message::Text(text)) => match &session {
                SessionState::Subscribed { team } => match classify_frame(&text) {
                    InboundFrame::Chat => {
                        // The payload was persisted by the REST layer before
                        // it reached us; relay it as received.
                        broadcaster.broadcast(team, &text, Some(connection));
                    }
                    InboundFrame::Empty => {
                        debug!(connection, "discarding empty inbox frame");
                    }
                    InboundFrame::Malformed(error) => {
                        // A single bad frame never tears down the connection.
                        warn!(connection, %error, "ignoring malformed inbox frame");
                    }
                },
                SessionState::Connecting => {
                    debug!(connection, "dropping frame from unsubscribed connection");
                }
                SessionState::Closed => {}
            },
            Ok(Message::Close(_)) => {
                session = SessionState::Closed;
            }
            Ok(_) => {
                // Ping/pong/binary frames carry nothing for the relay.
            }
            Err(error) => {
                warn!(connection, %error, "inbox connection errored");
                session = SessionState::Closed;
            }
        }
    }

    // Closed is terminal: unregister exactly once, cancel any writes still
    // queued for this peer, and leave every sibling connection alone.
    registry.unregister(connection);
    writer_task.abort();
    info!(connection, "inbox connection closed");
}
