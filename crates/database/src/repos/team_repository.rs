//! Repository for team and membership data access operations.

use crate::entities::{Team, TeamMemberInfo, TeamOverview};
use crate::types::{TeamError, TeamResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

pub struct TeamRepository {
    pool: SqlitePool,
}

impl TeamRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a team led by `leader_id`; the leader also becomes a member.
    pub async fn create(&self, name: &str, leader_id: i64) -> TeamResult<Team> {
        let public_id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO teams (public_id, name, leader_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(name)
        .bind(leader_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        let team_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO team_members (team_id, account_id, joined_at) VALUES (?, ?, ?)")
            .bind(team_id)
            .bind(leader_id)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        info!(team_id, public_id = %public_id, leader_id, "created team");

        Ok(Team {
            id: team_id,
            public_id,
            name: name.to_string(),
            leader_id,
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> TeamResult<Option<Team>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, leader_id, created_at FROM teams WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        row.map(map_team_row).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> TeamResult<Option<Team>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, leader_id, created_at FROM teams WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        row.map(map_team_row).transpose()
    }

    pub async fn is_member(&self, team_id: i64, account_id: i64) -> TeamResult<bool> {
        let row: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM team_members WHERE team_id = ? AND account_id = ?")
                .bind(team_id)
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        Ok(row.is_some())
    }

    /// Add an account to a team. Errors if the account is already a member.
    pub async fn add_member(&self, team_id: i64, account_id: i64) -> TeamResult<()> {
        if self.is_member(team_id, account_id).await? {
            return Err(TeamError::MemberAlreadyExists);
        }

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO team_members (team_id, account_id, joined_at) VALUES (?, ?, ?)")
            .bind(team_id)
            .bind(account_id)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        info!(team_id, account_id, "added team member");
        Ok(())
    }

    /// Remove a member. The leader cannot be removed from its own team.
    pub async fn remove_member(&self, team: &Team, account_id: i64) -> TeamResult<()> {
        if team.leader_id == account_id {
            return Err(TeamError::LeaderRemoval);
        }

        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND account_id = ?")
            .bind(team.id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(TeamError::MemberNotFound);
        }

        info!(team_id = team.id, account_id, "removed team member");
        Ok(())
    }

    /// Rename a team and/or hand leadership to another member.
    pub async fn update(
        &self,
        team_id: i64,
        name: Option<&str>,
        new_leader_id: Option<i64>,
    ) -> TeamResult<Team> {
        if let Some(leader_id) = new_leader_id {
            if !self.is_member(team_id, leader_id).await? {
                return Err(TeamError::MemberNotFound);
            }
        }

        match (name, new_leader_id) {
            (Some(name), Some(leader_id)) => {
                sqlx::query("UPDATE teams SET name = ?, leader_id = ? WHERE id = ?")
                    .bind(name)
                    .bind(leader_id)
                    .bind(team_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| TeamError::DatabaseError(e.to_string()))?;
            }
            (Some(name), None) => {
                sqlx::query("UPDATE teams SET name = ? WHERE id = ?")
                    .bind(name)
                    .bind(team_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| TeamError::DatabaseError(e.to_string()))?;
            }
            (None, Some(leader_id)) => {
                sqlx::query("UPDATE teams SET leader_id = ? WHERE id = ?")
                    .bind(leader_id)
                    .bind(team_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| TeamError::DatabaseError(e.to_string()))?;
            }
            (None, None) => {}
        }

        let row = sqlx::query(
            "SELECT id, public_id, name, leader_id, created_at FROM teams WHERE id = ?",
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        row.map(map_team_row)
            .transpose()?
            .ok_or(TeamError::TeamNotFound)
    }

    /// Every team the account leads or belongs to, with members and task
    /// counts, for the teams listing.
    pub async fn list_for_account(&self, account_id: i64) -> TeamResult<Vec<TeamOverview>> {
        let rows = sqlx::query(
            "SELECT t.id, t.public_id, t.name, t.leader_id, t.created_at, a.email AS leader_email
             FROM teams t
             JOIN accounts a ON a.id = t.leader_id
             WHERE t.leader_id = ? OR EXISTS (
                 SELECT 1 FROM team_members tm
                 WHERE tm.team_id = t.id AND tm.account_id = ?
             )
             ORDER BY t.created_at",
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        let mut overviews = Vec::with_capacity(rows.len());
        for row in rows {
            let leader_email: Option<String> = row
                .try_get("leader_email")
                .map_err(|e| TeamError::DatabaseError(e.to_string()))?;
            let team = map_team_row(row)?;

            let members = self.members_of(team.id).await?;
            let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE team_id = ?")
                .bind(team.id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

            let is_admin = team.leader_id == account_id;
            overviews.push(TeamOverview {
                team,
                leader_email: leader_email.unwrap_or_default(),
                members,
                task_count,
                is_admin,
            });
        }

        Ok(overviews)
    }

    /// Teams the account is a member of (id and name only), for the inbox
    /// sidebar.
    pub async fn list_membership(&self, account_id: i64) -> TeamResult<Vec<Team>> {
        let rows = sqlx::query(
            "SELECT t.id, t.public_id, t.name, t.leader_id, t.created_at
             FROM teams t
             JOIN team_members tm ON tm.team_id = t.id
             WHERE tm.account_id = ?
             ORDER BY t.created_at",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(map_team_row).collect()
    }

    async fn members_of(&self, team_id: i64) -> TeamResult<Vec<TeamMemberInfo>> {
        let rows = sqlx::query(
            "SELECT a.email, a.first_name, a.last_name
             FROM team_members tm
             JOIN accounts a ON a.id = tm.account_id
             WHERE tm.team_id = ?
             ORDER BY tm.joined_at",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TeamError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let email: Option<String> = row
                    .try_get("email")
                    .map_err(|e| TeamError::DatabaseError(e.to_string()))?;
                Ok(TeamMemberInfo {
                    email: email.unwrap_or_default(),
                    first_name: row
                        .try_get("first_name")
                        .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
                    last_name: row
                        .try_get("last_name")
                        .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
                })
            })
            .collect()
    }
}

fn map_team_row(row: sqlx::sqlite::SqliteRow) -> TeamResult<Team> {
    Ok(Team {
        id: row
            .try_get("id")
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
        leader_id: row
            .try_get("leader_id")
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| TeamError::DatabaseError(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::test_support::{seed_account, test_pool};

    #[tokio::test]
    async fn test_create_team_adds_leader_membership() {
        let (pool, _dir) = test_pool().await;
        let repo = TeamRepository::new(pool.clone());
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;

        let team = repo.create("Platform", leader).await.unwrap();
        assert!(team.id > 0);
        assert!(repo.is_member(team.id, leader).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_member_rejects_duplicates() {
        let (pool, _dir) = test_pool().await;
        let repo = TeamRepository::new(pool.clone());
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let member = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;

        let team = repo.create("Platform", leader).await.unwrap();
        repo.add_member(team.id, member).await.unwrap();

        let err = repo.add_member(team.id, member).await.unwrap_err();
        assert!(matches!(err, TeamError::MemberAlreadyExists));
    }

    #[tokio::test]
    async fn test_remove_member_refuses_leader() {
        let (pool, _dir) = test_pool().await;
        let repo = TeamRepository::new(pool.clone());
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;

        let team = repo.create("Platform", leader).await.unwrap();
        let err = repo.remove_member(&team, leader).await.unwrap_err();
        assert!(matches!(err, TeamError::LeaderRemoval));
    }

    #[tokio::test]
    async fn test_update_requires_new_leader_to_be_member() {
        let (pool, _dir) = test_pool().await;
        let repo = TeamRepository::new(pool.clone());
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let outsider = seed_account(&pool, "out@example.com", "Omar", "Sy").await;

        let team = repo.create("Platform", leader).await.unwrap();
        let err = repo
            .update(team.id, None, Some(outsider))
            .await
            .unwrap_err();
        assert!(matches!(err, TeamError::MemberNotFound));
    }

    #[tokio::test]
    async fn test_list_for_account_includes_members_and_counts() {
        let (pool, _dir) = test_pool().await;
        let repo = TeamRepository::new(pool.clone());
        let leader = seed_account(&pool, "lead@example.com", "Lena", "Ortiz").await;
        let member = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;

        let team = repo.create("Platform", leader).await.unwrap();
        repo.add_member(team.id, member).await.unwrap();

        let overviews = repo.list_for_account(member).await.unwrap();
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].members.len(), 2);
        assert_eq!(overviews[0].task_count, 0);
        assert!(!overviews[0].is_admin);

        let leader_view = repo.list_for_account(leader).await.unwrap();
        assert!(leader_view[0].is_admin);
    }
}
