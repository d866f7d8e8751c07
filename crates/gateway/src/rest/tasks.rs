//! Task management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use huddle_database::{CreateTaskRequest as StoreCreateTask, Task, TaskOverview, TaskStatus, UpdateTaskRequest};

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::CurrentAccount;
use crate::rest::{require_member, resolve_team};
use crate::state::GatewayState;

pub fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:task_id", patch(update_task).delete(delete_task))
        .route("/api/tasks/:task_id/status", post(toggle_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub team_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub team_id: String,
    pub team_name: String,
    pub name: String,
    pub description: String,
    pub priority: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_status: Option<TaskStatus>,
    pub is_admin: bool,
}

impl From<TaskOverview> for TaskResponse {
    fn from(overview: TaskOverview) -> Self {
        Self {
            id: overview.task.public_id,
            team_id: overview.team_public_id,
            team_name: overview.team_name,
            name: overview.task.name,
            description: overview.task.description,
            priority: overview.task.priority,
            start_date: overview.task.start_date,
            end_date: overview.task.end_date,
            my_status: overview.my_status,
            is_admin: overview.is_admin,
        }
    }
}

pub async fn create_task(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(payload): Json<CreateTaskPayload>,
) -> GatewayResult<(StatusCode, Json<serde_json::Value>)> {
    if payload.name.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Task name is required".to_string(),
        ));
    }

    let team = resolve_team(&state, &payload.team_id).await?;
    require_member(&state, &team, account.id).await?;

    let task = state
        .tasks
        .create(
            team.id,
            account.id,
            &StoreCreateTask {
                name: payload.name.trim().to_string(),
                description: payload.description,
                priority: payload.priority,
                start_date: payload.start_date,
                end_date: payload.end_date,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": task.public_id,
            "team_id": team.public_id,
            "name": task.name,
            "start_date": task.start_date,
            "end_date": task.end_date,
            "priority": task.priority,
        })),
    ))
}

pub async fn list_tasks(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> GatewayResult<Json<Vec<TaskResponse>>> {
    let overviews = state.tasks.list_for_account(account.id).await?;
    Ok(Json(overviews.into_iter().map(TaskResponse::from).collect()))
}

pub async fn update_task(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(task_id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> GatewayResult<Json<serde_json::Value>> {
    let task = resolve_task(&state, &task_id).await?;
    require_task_admin(&state, &task, account.id).await?;

    let updated = state.tasks.update(task.id, &payload).await?;

    Ok(Json(json!({
        "id": updated.public_id,
        "name": updated.name,
        "description": updated.description,
        "priority": updated.priority,
        "start_date": updated.start_date,
        "end_date": updated.end_date,
    })))
}

/// Flip the caller's own assignment between open and done.
pub async fn toggle_status(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(task_id): Path<String>,
) -> GatewayResult<Json<serde_json::Value>> {
    let task = resolve_task(&state, &task_id).await?;
    let status = state.tasks.toggle_status(task.id, account.id).await?;

    Ok(Json(json!({
        "id": task.public_id,
        "status": status,
    })))
}

pub async fn delete_task(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(task_id): Path<String>,
) -> GatewayResult<Json<serde_json::Value>> {
    let task = resolve_task(&state, &task_id).await?;
    require_task_admin(&state, &task, account.id).await?;

    state.tasks.delete(task.id).await?;

    Ok(Json(json!({ "deleted": task.public_id })))
}

async fn resolve_task(state: &GatewayState, public_id: &str) -> GatewayResult<Task> {
    state
        .tasks
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("Task not found".to_string()))
}

/// Creator or team leader.
async fn require_task_admin(
    state: &GatewayState,
    task: &Task,
    account_id: i64,
) -> GatewayResult<()> {
    if task.creator_id == account_id {
        return Ok(());
    }

    let team = state
        .teams
        .find_by_id(task.team_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound("Team not found".to_string()))?;

    if team.leader_id != account_id {
        return Err(GatewayError::AuthorizationFailed(
            "Not authorized to modify this task".to_string(),
        ));
    }

    Ok(())
}
