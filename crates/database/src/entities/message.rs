//! Inbox message entities
//!
//! Messages are append-only: once stored they are never updated, and only
//! disappear when their team is deleted.

use serde::{Deserialize, Serialize};

/// Parameters for persisting one chat entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub team_id: i64,
    pub author_id: i64,
    pub body: String,
    pub related_task_id: Option<i64>,
}

/// A stored message hydrated with author identity, as returned by the
/// message store's insert and history operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub team_public_id: String,
    pub body: String,
    pub related_task_public_id: Option<String>,
    pub created_at: String,
    pub author_public_id: String,
    pub author_email: String,
    pub author_first_name: String,
    pub author_last_name: String,
}
