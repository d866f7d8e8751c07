//! Repository for task and assignment data access operations.

use crate::entities::{CreateTaskRequest, Task, TaskOverview, TaskStatus, TodayTask, UpdateTaskRequest};
use crate::types::{TaskError, TaskResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a task and an open assignment for its creator, atomically.
    pub async fn create(
        &self,
        team_id: i64,
        creator_id: i64,
        request: &CreateTaskRequest,
    ) -> TaskResult<Task> {
        let public_id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO tasks (public_id, team_id, creator_id, name, description, priority, start_date, end_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(team_id)
        .bind(creator_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.priority)
        .bind(&request.start_date)
        .bind(&request.end_date)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        let task_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO task_assignments (task_id, account_id, status) VALUES (?, ?, ?)",
        )
        .bind(task_id)
        .bind(creator_id)
        .bind(TaskStatus::Open.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        info!(task_id, public_id = %public_id, team_id, creator_id, "created task");

        Ok(Task {
            id: task_id,
            public_id,
            team_id,
            creator_id,
            name: request.name.clone(),
            description: request.description.clone(),
            priority: request.priority.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> TaskResult<Option<Task>> {
        let row = sqlx::query(
            "SELECT id, public_id, team_id, creator_id, name, description, priority, start_date, end_date, created_at, updated_at
             FROM tasks WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        row.map(map_task_row).transpose()
    }

    /// Every task visible to the account: created by it, in a team it leads,
    /// or in a team it belongs to. Each row carries the account's own
    /// assignment status and whether it may administer the task.
    pub async fn list_for_account(&self, account_id: i64) -> TaskResult<Vec<TaskOverview>> {
        let rows = sqlx::query(
            "SELECT t.id, t.public_id, t.team_id, t.creator_id, t.name, t.description, t.priority,
                    t.start_date, t.end_date, t.created_at, t.updated_at,
                    te.public_id AS team_public_id, te.name AS team_name, te.leader_id,
                    ta.status AS my_status
             FROM tasks t
             JOIN teams te ON te.id = t.team_id
             LEFT JOIN task_assignments ta ON ta.task_id = t.id AND ta.account_id = ?
             WHERE t.creator_id = ?
                OR te.leader_id = ?
                OR EXISTS (
                    SELECT 1 FROM team_members tm
                    WHERE tm.team_id = t.team_id AND tm.account_id = ?
                )
             ORDER BY t.start_date DESC",
        )
        .bind(account_id)
        .bind(account_id)
        .bind(account_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let team_public_id: String = row
                    .try_get("team_public_id")
                    .map_err(|e| TaskError::DatabaseError(e.to_string()))?;
                let team_name: String = row
                    .try_get("team_name")
                    .map_err(|e| TaskError::DatabaseError(e.to_string()))?;
                let leader_id: i64 = row
                    .try_get("leader_id")
                    .map_err(|e| TaskError::DatabaseError(e.to_string()))?;
                let my_status: Option<String> = row
                    .try_get("my_status")
                    .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

                let task = map_task_row(row)?;
                let is_admin = task.creator_id == account_id || leader_id == account_id;

                Ok(TaskOverview {
                    is_admin,
                    team_public_id,
                    team_name,
                    my_status: my_status.as_deref().map(TaskStatus::from),
                    task,
                })
            })
            .collect()
    }

    /// Update task fields; absent fields keep their current value.
    pub async fn update(&self, task_id: i64, request: &UpdateTaskRequest) -> TaskResult<Task> {
        let mut update_fields = Vec::new();
        let mut values = Vec::new();

        if let Some(name) = &request.name {
            update_fields.push("name = ?");
            values.push(name.clone());
        }
        if let Some(description) = &request.description {
            update_fields.push("description = ?");
            values.push(description.clone());
        }
        if let Some(priority) = &request.priority {
            update_fields.push("priority = ?");
            values.push(priority.clone());
        }
        if let Some(start_date) = &request.start_date {
            update_fields.push("start_date = ?");
            values.push(start_date.clone());
        }
        if let Some(end_date) = &request.end_date {
            update_fields.push("end_date = ?");
            values.push(end_date.clone());
        }

        if !update_fields.is_empty() {
            let now = chrono::Utc::now().to_rfc3339();
            update_fields.push("updated_at = ?");
            values.push(now);

            let query = format!(
                "UPDATE tasks SET {} WHERE id = ?",
                update_fields.join(", ")
            );

            let mut query_builder = sqlx::query(&query);
            for value in &values {
                query_builder = query_builder.bind(value);
            }

            query_builder
                .bind(task_id)
                .execute(&self.pool)
                .await
                .map_err(|e| TaskError::DatabaseError(e.to_string()))?;
        }

        let row = sqlx::query(
            "SELECT id, public_id, team_id, creator_id, name, description, priority, start_date, end_date, created_at, updated_at
             FROM tasks WHERE id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        row.map(map_task_row)
            .transpose()?
            .ok_or(TaskError::TaskNotFound)
    }

    /// Flip the account's own assignment between open and done, returning
    /// the new status.
    pub async fn toggle_status(&self, task_id: i64, account_id: i64) -> TaskResult<TaskStatus> {
        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM task_assignments WHERE task_id = ? AND account_id = ?",
        )
        .bind(task_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        let Some(current) = current else {
            return Err(TaskError::AssignmentNotFound);
        };

        let next = TaskStatus::from(current.as_str()).toggled();

        sqlx::query("UPDATE task_assignments SET status = ? WHERE task_id = ? AND account_id = ?")
            .bind(next.as_str())
            .bind(task_id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        Ok(next)
    }

    /// Delete a task; assignments cascade.
    pub async fn delete(&self, task_id: i64) -> TaskResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(TaskError::TaskNotFound);
        }

        info!(task_id, "deleted task");
        Ok(())
    }

    /// The account's assigned tasks that start on `date` (YYYY-MM-DD).
    pub async fn today_for_account(
        &self,
        account_id: i64,
        date: &str,
    ) -> TaskResult<Vec<TodayTask>> {
        let rows = sqlx::query(
            "SELECT DISTINCT te.name AS team_name, t.name AS task_name,
                    t.start_date, t.end_date, t.priority
             FROM tasks t
             JOIN task_assignments ta ON ta.task_id = t.id
             JOIN teams te ON te.id = t.team_id
             WHERE ta.account_id = ? AND t.start_date = ?
             ORDER BY t.priority, t.name",
        )
        .bind(account_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TaskError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(TodayTask {
                    team_name: row
                        .try_get("team_name")
                        .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
                    task_name: row
                        .try_get("task_name")
                        .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
                    start_date: row
                        .try_get("start_date")
                        .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
                    end_date: row
                        .try_get("end_date")
                        .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
                    priority: row
                        .try_get("priority")
                        .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
                })
            })
            .collect()
    }
}

fn map_task_row(row: sqlx::sqlite::SqliteRow) -> TaskResult<Task> {
    Ok(Task {
        id: row
            .try_get("id")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        team_id: row
            .try_get("team_id")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        creator_id: row
            .try_get("creator_id")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        priority: row
            .try_get("priority")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        start_date: row
            .try_get("start_date")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        end_date: row
            .try_get("end_date")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| TaskError::DatabaseError(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::test_support::{seed_account, test_pool};
    use crate::repos::TeamRepository;

    fn sample_request(name: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            name: name.to_string(),
            description: "write the rollout doc".to_string(),
            priority: "High".to_string(),
            start_date: "2025-03-10".to_string(),
            end_date: "2025-03-14".to_string(),
        }
    }

    async fn seed_team(pool: &sqlx::SqlitePool, leader: i64) -> crate::entities::Team {
        TeamRepository::new(pool.clone())
            .create("Platform", leader)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_task_assigns_creator_open() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let team = seed_team(&pool, leader).await;
        let repo = TaskRepository::new(pool.clone());

        let task = repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();
        assert!(task.id > 0);

        let overviews = repo.list_for_account(leader).await.unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].my_status, Some(TaskStatus::Open));
        assert!(overviews[0].is_admin);
    }

    #[tokio::test]
    async fn test_toggle_status_flips_and_requires_assignment() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let member = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;
        let team = seed_team(&pool, leader).await;
        let repo = TaskRepository::new(pool.clone());

        let task = repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();

        assert_eq!(
            repo.toggle_status(task.id, leader).await.unwrap(),
            TaskStatus::Done
        );
        assert_eq!(
            repo.toggle_status(task.id, leader).await.unwrap(),
            TaskStatus::Open
        );

        let err = repo.toggle_status(task.id, member).await.unwrap_err();
        assert!(matches!(err, TaskError::AssignmentNotFound));
    }

    #[tokio::test]
    async fn test_member_sees_team_tasks_without_assignment() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let member = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;
        let team = seed_team(&pool, leader).await;
        TeamRepository::new(pool.clone())
            .add_member(team.id, member)
            .await
            .unwrap();

        let repo = TaskRepository::new(pool.clone());
        repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();

        let overviews = repo.list_for_account(member).await.unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].my_status, None);
        assert!(!overviews[0].is_admin);
    }

    #[tokio::test]
    async fn test_update_changes_only_provided_fields() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let team = seed_team(&pool, leader).await;
        let repo = TaskRepository::new(pool.clone());

        let task = repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();

        let updated = repo
            .update(
                task.id,
                &UpdateTaskRequest {
                    priority: Some("Low".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.priority, "Low");
        assert_eq!(updated.name, "Ship v2");
    }

    #[tokio::test]
    async fn test_delete_task_cascades_assignments() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let team = seed_team(&pool, leader).await;
        let repo = TaskRepository::new(pool.clone());

        let task = repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();
        repo.delete(task.id).await.unwrap();

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM task_assignments WHERE task_id = ?")
                .bind(task.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(remaining, 0);

        let err = repo.delete(task.id).await.unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound));
    }

    #[tokio::test]
    async fn test_today_filters_by_start_date() {
        let (pool, _dir) = test_pool().await;
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let team = seed_team(&pool, leader).await;
        let repo = TaskRepository::new(pool.clone());

        repo.create(team.id, leader, &sample_request("Ship v2")).await.unwrap();
        let mut other = sample_request("Plan v3");
        other.start_date = "2025-03-11".to_string();
        repo.create(team.id, leader, &other).await.unwrap();

        let today = repo.today_for_account(leader, "2025-03-10").await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].task_name, "Ship v2");
    }
}
