//! The "today" view: assigned tasks starting today

use axum::{extract::State, routing::get, Extension, Json, Router};

use huddle_database::TodayTask;

use crate::error::GatewayResult;
use crate::middleware::CurrentAccount;
use crate::state::GatewayState;

pub fn routes() -> Router<GatewayState> {
    Router::new().route("/api/today", get(today_tasks))
}

pub async fn today_tasks(
    State(state): State<GatewayState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> GatewayResult<Json<Vec<TodayTask>>> {
    // Matches the dates tasks are entered with, which are calendar days in
    // the server's timezone.
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let tasks = state.tasks.today_for_account(account.id, &today).await?;
    Ok(Json(tasks))
}
