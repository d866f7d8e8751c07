//! Database repository implementations

pub mod account_repository;
pub mod message_repository;
pub mod task_repository;
pub mod team_repository;

// Re-export all repositories for convenience
pub use account_repository::*;
pub use message_repository::*;
pub use task_repository::*;
pub use team_repository::*;
