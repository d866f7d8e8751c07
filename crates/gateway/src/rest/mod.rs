//! REST endpoints for the gateway

pub mod accounts;
pub mod health;
pub mod inbox;
pub mod tasks;
pub mod teams;
pub mod today;

use axum::Router;

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

/// Routes that require an authenticated session.
pub fn create_protected_routes() -> Router<GatewayState> {
    Router::new()
        .merge(accounts::protected_routes())
        .merge(teams::routes())
        .merge(tasks::routes())
        .merge(inbox::routes())
        .merge(today::routes())
}

/// Routes reachable without a session: registration, login, OAuth, health.
pub fn create_public_routes() -> Router<GatewayState> {
    Router::new()
        .merge(accounts::public_routes())
        .merge(health::routes())
}

/// Resolve a team public id or fail with 404.
pub(crate) async fn resolve_team(
    state: &GatewayState,
    public_id: &str,
) -> GatewayResult<huddle_database::Team> {
    state
        .teams
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("Team not found".to_string()))
}

/// Only the team leader may pass.
pub(crate) fn require_leader(
    team: &huddle_database::Team,
    account: &huddle_auth::Account,
) -> GatewayResult<()> {
    if team.leader_id != account.id {
        return Err(GatewayError::AuthorizationFailed(
            "Only the team leader may do this".to_string(),
        ));
    }
    Ok(())
}

/// Only team members may pass.
pub(crate) async fn require_member(
    state: &GatewayState,
    team: &huddle_database::Team,
    account_id: i64,
) -> GatewayResult<()> {
    if !state.teams.is_member(team.id, account_id).await? {
        return Err(GatewayError::AuthorizationFailed(
            "Not a member of this team".to_string(),
        ));
    }
    Ok(())
}
