//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Database query error: {0}")]
    QueryError(String),
}

/// Team-specific database errors
#[derive(Debug, Error)]
pub enum TeamError {
    #[error("Team not found")]
    TeamNotFound,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Member already exists")]
    MemberAlreadyExists,

    #[error("The team leader cannot be removed")]
    LeaderRemoval,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Task-specific database errors
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    TaskNotFound,

    #[error("Assignment not found")]
    AssignmentNotFound,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Inbox-specific database errors
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Team not found")]
    TeamNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
