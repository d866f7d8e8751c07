//! Shared types and result types for the database layer

pub mod errors;

pub use errors::{DatabaseError, InboxError, TaskError, TeamError};

pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type TeamResult<T> = Result<T, TeamError>;
pub type TaskResult<T> = Result<T, TaskError>;
pub type InboxResult<T> = Result<T, InboxError>;
