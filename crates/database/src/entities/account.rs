//! Account entity definitions

use serde::{Deserialize, Serialize};

/// An account row as stored. Accounts created through Google OAuth carry no
/// password identity; their names are refreshed from the Google profile on
/// each login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}
