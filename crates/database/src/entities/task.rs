//! Task entity definitions

use serde::{Deserialize, Serialize};

/// Task entity representing one row in the tasks table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub team_id: i64,
    #[serde(skip_serializing)]
    pub creator_id: i64,
    pub name: String,
    pub description: String,
    pub priority: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-member completion status of a task assignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }

    /// The status a toggle moves to.
    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Open => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Open,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "done" => TaskStatus::Done,
            _ => TaskStatus::Open,
        }
    }
}

/// Request for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: String,
    pub start_date: String,
    pub end_date: String,
}

/// Request for updating an existing task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A task as listed for one account: the task itself, its team name, the
/// account's own assignment status (if any), and whether the account may
/// administer it (creator or team leader).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOverview {
    pub task: Task,
    pub team_public_id: String,
    pub team_name: String,
    pub my_status: Option<TaskStatus>,
    pub is_admin: bool,
}

/// A row of the "today" view: assigned tasks whose start date is today
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayTask {
    pub team_name: String,
    pub task_name: String,
    pub start_date: String,
    pub end_date: String,
    pub priority: String,
}
