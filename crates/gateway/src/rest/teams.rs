//! Team management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use huddle_database::{TeamMemberInfo, TeamOverview};

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::CurrentAccount;
use crate::rest::{require_leader, resolve_team};
use crate::state::GatewayState;

pub fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/:team_id", patch(update_team))
        .route("/api/teams/:team_id/members", post(add_member))
        .route("/api/teams/:team_id/members/:email", delete(remove_member))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub member_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub new_leader_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub leader_email: String,
    pub created_at: String,
    pub task_count: i64,
    pub members: Vec<TeamMemberInfo>,
    pub is_admin: bool,
}

impl From<TeamOverview> for TeamResponse {
    fn from(overview: TeamOverview) -> Self {
        Self {
            id: overview.team.public_id,
            name: overview.team.name,
            leader_email: overview.leader_email,
            created_at: overview.team.created_at,
            task_count: overview.task_count,
            members: overview.members,
            is_admin: overview.is_admin,
        }
    }
}

pub async fn list_teams(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> GatewayResult<Json<Vec<TeamResponse>>> {
    let overviews = state.teams.list_for_account(account.id).await?;
    Ok(Json(overviews.into_iter().map(TeamResponse::from).collect()))
}

/// Create a team. Every listed member email must belong to an existing
/// account; otherwise nothing is created and the unknown emails are
/// reported back.
pub async fn create_team(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<CreateTeamRequest>,
) -> GatewayResult<(StatusCode, Json<serde_json::Value>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Team name is required".to_string(),
        ));
    }

    let mut members = Vec::new();
    let mut invalid_emails = Vec::new();
    for email in &payload.member_emails {
        match state.accounts.find_by_email(email.trim()).await? {
            Some(member) => members.push(member),
            None => invalid_emails.push(email.clone()),
        }
    }

    if !invalid_emails.is_empty() {
        return Err(GatewayError::InvalidRequest(format!(
            "Unknown member emails: {}",
            invalid_emails.join(", ")
        )));
    }

    let team = state.teams.create(name, account.id).await?;

    for member in members {
        // The creator may list themselves; they are already a member.
        if member.id == account.id {
            continue;
        }
        state.teams.add_member(team.id, member.id).await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": team.public_id,
            "name": team.name,
            "created_at": team.created_at,
        })),
    ))
}

pub async fn update_team(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(team_id): Path<String>,
    Json(payload): Json<UpdateTeamRequest>,
) -> GatewayResult<Json<serde_json::Value>> {
    let team = resolve_team(&state, &team_id).await?;
    require_leader(&team, &account)?;

    if payload.name.is_none() && payload.new_leader_email.is_none() {
        return Err(GatewayError::InvalidRequest(
            "No updates provided".to_string(),
        ));
    }

    let new_leader_id = match &payload.new_leader_email {
        Some(email) => {
            let leader = state
                .accounts
                .find_by_email(email.trim())
                .await?
                .ok_or_else(|| GatewayError::NotFound("Account not found".to_string()))?;
            Some(leader.id)
        }
        None => None,
    };

    let updated = state
        .teams
        .update(team.id, payload.name.as_deref().map(str::trim), new_leader_id)
        .await?;

    Ok(Json(json!({
        "id": updated.public_id,
        "name": updated.name,
        "created_at": updated.created_at,
    })))
}

pub async fn add_member(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(team_id): Path<String>,
    Json(payload): Json<AddMemberRequest>,
) -> GatewayResult<(StatusCode, Json<TeamMemberInfo>)> {
    let team = resolve_team(&state, &team_id).await?;
    require_leader(&team, &account)?;

    let member = state
        .accounts
        .find_by_email(payload.email.trim())
        .await?
        .ok_or_else(|| GatewayError::NotFound("Account not found".to_string()))?;

    state.teams.add_member(team.id, member.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(TeamMemberInfo {
            email: member.email.unwrap_or_default(),
            first_name: member.first_name,
            last_name: member.last_name,
        }),
    ))
}

pub async fn remove_member(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path((team_id, email)): Path<(String, String)>,
) -> GatewayResult<Json<serde_json::Value>> {
    let team = resolve_team(&state, &team_id).await?;
    require_leader(&team, &account)?;

    let member = state
        .accounts
        .find_by_email(email.trim())
        .await?
        .ok_or_else(|| GatewayError::NotFound("Account not found".to_string()))?;

    state.teams.remove_member(&team, member.id).await?;

    Ok(Json(json!({ "removed": email })))
}
