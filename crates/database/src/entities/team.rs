//! Team entity definitions

use serde::{Deserialize, Serialize};

/// Team entity representing one row in the teams table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub leader_id: i64,
    pub created_at: String,
}

/// A member as listed inside a team overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMemberInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A team with everything the teams listing needs: membership, task count,
/// and whether the requesting account leads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamOverview {
    pub team: Team,
    pub leader_email: String,
    pub members: Vec<TeamMemberInfo>,
    pub task_count: i64,
    pub is_admin: bool,
}
