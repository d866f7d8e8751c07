//! Huddle Database Crate
//!
//! This crate provides database functionality for the Huddle backend,
//! including connection management, migrations, and repository
//! implementations for teams, tasks, and the inbox message store.

use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{AccountRepository, MessageRepository, TaskRepository, TeamRepository};

// Re-export entities
pub use entities::{
    account::Account,
    message::{NewMessage, StoredMessage},
    task::{CreateTaskRequest, Task, TaskOverview, TaskStatus, TodayTask, UpdateTaskRequest},
    team::{Team, TeamMemberInfo, TeamOverview},
};

// Re-export types
pub use types::{
    errors::{DatabaseError, InboxError, TaskError, TeamError},
    DatabaseResult, InboxResult, TaskResult, TeamResult,
};

/// Initialize the database with migrations
pub async fn initialize_database(
    config: &huddle_config::DatabaseConfig,
) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
