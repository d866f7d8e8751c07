//! Read-side account lookups.
//!
//! Account creation goes through the auth crate; the repositories only ever
//! need to resolve existing accounts by id, public id, or email.

use crate::entities::Account;
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{Row, SqlitePool};

pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, public_id, email, first_name, last_name, created_at, updated_at
             FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        row.map(map_account_row).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, public_id, email, first_name, last_name, created_at, updated_at
             FROM accounts WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        row.map(map_account_row).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, public_id, email, first_name, last_name, created_at, updated_at
             FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        row.map(map_account_row).transpose()
    }
}

fn map_account_row(row: sqlx::sqlite::SqliteRow) -> DatabaseResult<Account> {
    Ok(Account {
        id: row
            .try_get("id")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        email: row
            .try_get("email")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        first_name: row
            .try_get("first_name")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        last_name: row
            .try_get("last_name")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?,
    })
}
