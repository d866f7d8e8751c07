//! Repository for the inbox message store.
//!
//! This is the durable side of the inbox: inserts complete here before the
//! relay ever broadcasts, and history reads reconstruct whatever live
//! delivery missed.

use crate::entities::{NewMessage, StoredMessage};
use crate::types::{InboxError, InboxResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist one message and return it hydrated with author identity.
    pub async fn insert(&self, message: &NewMessage) -> InboxResult<StoredMessage> {
        let public_id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (public_id, team_id, author_id, body, related_task_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(message.team_id)
        .bind(message.author_id)
        .bind(&message.body)
        .bind(message.related_task_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| InboxError::DatabaseError(e.to_string()))?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id,
            public_id = %public_id,
            team_id = message.team_id,
            author_id = message.author_id,
            "stored inbox message"
        );

        self.find_by_id(message_id)
            .await?
            .ok_or(InboxError::MessageNotFound)
    }

    /// Message history for a team, most recent first.
    pub async fn history(
        &self,
        team_id: i64,
        limit: Option<i64>,
    ) -> InboxResult<Vec<StoredMessage>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

        let rows = sqlx::query(&format!(
            "{HYDRATED_SELECT} WHERE m.team_id = ? ORDER BY m.created_at DESC, m.id DESC LIMIT ?"
        ))
        .bind(team_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| InboxError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(map_message_row).collect()
    }

    async fn find_by_id(&self, id: i64) -> InboxResult<Option<StoredMessage>> {
        let row = sqlx::query(&format!("{HYDRATED_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?;

        row.map(map_message_row).transpose()
    }
}

const HYDRATED_SELECT: &str = "SELECT m.id, m.public_id, m.body, m.created_at,
        te.public_id AS team_public_id,
        t.public_id AS related_task_public_id,
        a.public_id AS author_public_id, a.email AS author_email,
        a.first_name AS author_first_name, a.last_name AS author_last_name
     FROM messages m
     JOIN teams te ON te.id = m.team_id
     JOIN accounts a ON a.id = m.author_id
     LEFT JOIN tasks t ON t.id = m.related_task_id";

fn map_message_row(row: sqlx::sqlite::SqliteRow) -> InboxResult<StoredMessage> {
    let author_email: Option<String> = row
        .try_get("author_email")
        .map_err(|e| InboxError::DatabaseError(e.to_string()))?;

    Ok(StoredMessage {
        id: row
            .try_get("id")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        team_public_id: row
            .try_get("team_public_id")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        body: row
            .try_get("body")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        related_task_public_id: row
            .try_get("related_task_public_id")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        author_public_id: row
            .try_get("author_public_id")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        author_email: author_email.unwrap_or_default(),
        author_first_name: row
            .try_get("author_first_name")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
        author_last_name: row
            .try_get("author_last_name")
            .map_err(|e| InboxError::DatabaseError(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::test_support::{seed_account, test_pool};
    use crate::repos::TeamRepository;

    #[tokio::test]
    async fn test_insert_returns_hydrated_message() {
        let (pool, _dir) = test_pool().await;
        let author = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;
        let team = TeamRepository::new(pool.clone())
            .create("Platform", author)
            .await
            .unwrap();

        let repo = MessageRepository::new(pool.clone());
        let stored = repo
            .insert(&NewMessage {
                team_id: team.id,
                author_id: author,
                body: "standup in five".to_string(),
                related_task_id: None,
            })
            .await
            .unwrap();

        assert_eq!(stored.body, "standup in five");
        assert_eq!(stored.author_email, "dev@example.com");
        assert_eq!(stored.author_first_name, "Devi");
        assert_eq!(stored.team_public_id, team.public_id);
        assert!(stored.related_task_public_id.is_none());
    }

    #[tokio::test]
    async fn test_history_returns_most_recent_first() {
        let (pool, _dir) = test_pool().await;
        let author = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;
        let team = TeamRepository::new(pool.clone())
            .create("Platform", author)
            .await
            .unwrap();

        let repo = MessageRepository::new(pool.clone());
        for body in ["first", "second", "third"] {
            repo.insert(&NewMessage {
                team_id: team.id,
                author_id: author,
                body: body.to_string(),
                related_task_id: None,
            })
            .await
            .unwrap();
        }

        let history = repo.history(team.id, None).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].body, "third");
        assert_eq!(history[2].body, "first");

        let limited = repo.history(team.id, Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].body, "third");
    }

    #[tokio::test]
    async fn test_history_is_scoped_per_team() {
        let (pool, _dir) = test_pool().await;
        let author = seed_account(&pool, "dev@example.com", "Devi", "Rao").await;
        let teams = TeamRepository::new(pool.clone());
        let platform = teams.create("Platform", author).await.unwrap();
        let design = teams.create("Design", author).await.unwrap();

        let repo = MessageRepository::new(pool.clone());
        repo.insert(&NewMessage {
            team_id: platform.id,
            author_id: author,
            body: "platform only".to_string(),
            related_task_id: None,
        })
        .await
        .unwrap();

        let history = repo.history(design.id, None).await.unwrap();
        assert!(history.is_empty());
    }
}
