//! Inbox endpoints: the REST collaborator of the relay.
//!
//! Chat entries are persisted here, before any live fan-out. The returned
//! message is what the client subsequently pushes over its WebSocket, and
//! what history reads reproduce for anyone who missed the broadcast.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use huddle_database::{NewMessage, StoredMessage};

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::CurrentAccount;
use crate::rest::{require_member, resolve_team};
use crate::state::GatewayState;

pub fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/api/inbox/messages", post(send_message))
        .route("/api/inbox/teams", get(inbox_teams))
        .route("/api/inbox/teams/:team_id/messages", get(team_messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub team_id: String,
    pub body: String,
    pub related_task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub team_id: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_task_id: Option<String>,
    pub created_at: String,
    pub author_id: String,
    pub author_email: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub is_mine: bool,
}

impl MessageResponse {
    fn new(message: StoredMessage, caller_public_id: &str) -> Self {
        Self {
            is_mine: message.author_public_id == caller_public_id,
            id: message.public_id,
            team_id: message.team_public_id,
            body: message.body,
            related_task_id: message.related_task_public_id,
            created_at: message.created_at,
            author_id: message.author_public_id,
            author_email: message.author_email,
            author_first_name: message.author_first_name,
            author_last_name: message.author_last_name,
        }
    }
}

/// Persist one chat entry. Completing this insert is what makes the message
/// eligible for broadcast; the relay itself never writes.
pub async fn send_message(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<SendMessageRequest>,
) -> GatewayResult<(StatusCode, Json<MessageResponse>)> {
    if payload.body.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Message body must not be empty".to_string(),
        ));
    }

    let team = resolve_team(&state, &payload.team_id).await?;
    require_member(&state, &team, account.id).await?;

    let related_task_id = match &payload.related_task_id {
        Some(task_public_id) => {
            let task = state
                .tasks
                .find_by_public_id(task_public_id)
                .await?
                .ok_or_else(|| GatewayError::NotFound("Task not found".to_string()))?;
            if task.team_id != team.id {
                return Err(GatewayError::InvalidRequest(
                    "Related task belongs to another team".to_string(),
                ));
            }
            Some(task.id)
        }
        None => None,
    };

    let stored = state
        .messages
        .insert(&NewMessage {
            team_id: team.id,
            author_id: account.id,
            body: payload.body,
            related_task_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(stored, &account.public_id)),
    ))
}

/// The teams the caller can read an inbox for, for the sidebar.
pub async fn inbox_teams(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> GatewayResult<Json<Vec<serde_json::Value>>> {
    let teams = state.teams.list_membership(account.id).await?;

    Ok(Json(
        teams
            .into_iter()
            .map(|team| json!({ "id": team.public_id, "name": team.name }))
            .collect(),
    ))
}

/// Message history, most recent first. This is the catch-up path for
/// anything the live relay did not deliver.
pub async fn team_messages(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(team_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let team = resolve_team(&state, &team_id).await?;
    require_member(&state, &team, account.id).await?;

    let history = state.messages.history(team.id, query.limit).await?;

    Ok(Json(
        history
            .into_iter()
            .map(|message| MessageResponse::new(message, &account.public_id))
            .collect(),
    ))
}
