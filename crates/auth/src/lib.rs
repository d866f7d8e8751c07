use anyhow::Context;
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use once_cell::sync::Lazy;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool, Transaction};
use thiserror::Error;
use tracing::{debug, info};

use huddle_config::{AuthConfig, GoogleAuthConfig};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_API: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Every password registration seeds a personal team with this name.
const DEFAULT_TEAM_NAME: &str = "My Tasks";

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
    google: Option<GoogleOAuth>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists")]
    AccountExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("google oauth is not configured")]
    GoogleOauthDisabled,
    #[error("google oauth error: {0}")]
    GoogleOauth(#[from] anyhow::Error),
    #[error("google profile has no email")]
    GoogleProfileMissingEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds as i64);
        let google = GoogleOAuth::from_config(&config.google);

        Self {
            pool,
            session_ttl,
            google,
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub fn google_enabled(&self) -> bool {
        self.google.is_some()
    }

    pub fn google_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
    ) -> Result<String, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::GoogleOauthDisabled)?;
        google
            .authorize_url(state, redirect_uri)
            .map_err(AuthError::GoogleOauth)
    }

    /// Register a local-credential account. Also seeds the account's default
    /// personal team, in the same transaction, so a fresh login always has
    /// somewhere to put tasks.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Account, AuthError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(AuthError::AccountExists);
        }

        let now = Utc::now();
        let password_hash = self.hash_password(password)?;

        let account = self
            .insert_account(&mut tx, Some(email.to_owned()), first_name, last_name)
            .await?;

        sqlx::query(
            "INSERT INTO account_identities (account_id, provider, provider_uid, secret, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(account.id)
        .bind("password")
        .bind(email)
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        self.insert_default_team(&mut tx, account.id).await?;

        tx.commit().await?;

        info!(account = %account.public_id, "registered account");
        Ok(account)
    }

    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let identity = sqlx::query(
            "SELECT account_id, secret FROM account_identities WHERE provider = 'password' AND provider_uid = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = identity else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: String = row.try_get("secret")?;
        let stored_hash = PasswordHash::new(&secret)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let account_id: i64 = row.try_get("account_id")?;
        self.fetch_account(account_id).await?;

        self.issue_session(account_id).await
    }

    pub async fn login_with_google_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthSession, AuthError> {
        let google = self.google.as_ref().ok_or(AuthError::GoogleOauthDisabled)?;

        let profile = google
            .exchange_code(code, redirect_uri)
            .await
            .map_err(AuthError::GoogleOauth)?;

        self.login_with_google_profile(profile).await
    }

    /// Find or create the account a Google profile maps to and issue a
    /// session. Names are refreshed from the profile on every login.
    pub async fn login_with_google_profile(
        &self,
        profile: GoogleProfile,
    ) -> Result<AuthSession, AuthError> {
        let email = profile
            .email
            .clone()
            .ok_or(AuthError::GoogleProfileMissingEmail)?;
        let first_name = profile.first_name.clone().unwrap_or_default();
        let last_name = profile.last_name.clone().unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        if let Some(row) = sqlx::query(
            "SELECT account_id FROM account_identities WHERE provider = 'google' AND provider_uid = ?",
        )
        .bind(&profile.id)
        .fetch_optional(&mut *tx)
        .await?
        {
            let account_id: i64 = row.try_get("account_id")?;
            sqlx::query("UPDATE accounts SET first_name = ?, last_name = ?, updated_at = ? WHERE id = ?")
                .bind(&first_name)
                .bind(&last_name)
                .bind(Utc::now().to_rfc3339())
                .bind(account_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return self.issue_session(account_id).await;
        }

        let account = if let Some(row) = sqlx::query("SELECT id FROM accounts WHERE email = ?")
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await?
        {
            let account_id: i64 = row.try_get("id")?;
            sqlx::query("UPDATE accounts SET first_name = ?, last_name = ?, updated_at = ? WHERE id = ?")
                .bind(&first_name)
                .bind(&last_name)
                .bind(Utc::now().to_rfc3339())
                .bind(account_id)
                .execute(&mut *tx)
                .await?;
            self.fetch_account_tx(&mut tx, account_id).await?
        } else {
            self.insert_account(&mut tx, Some(email.clone()), &first_name, &last_name)
                .await?
        };

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO account_identities (account_id, provider, provider_uid, secret, created_at, updated_at) VALUES (?, ?, ?, NULL, ?, ?)",
        )
        .bind(account.id)
        .bind("google")
        .bind(&profile.id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(account = %account.public_id, email = %email, "linked google identity");
        self.issue_session(account.id).await
    }

    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<(Account, AuthSession), AuthError> {
        let row = sqlx::query("SELECT account_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let account_id: i64 = row.try_get("account_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let account = self.fetch_account(account_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            account_id,
            expires_at,
        };

        Ok((account, session))
    }

    /// Delete a session so its token stops authenticating.
    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::SessionNotFound);
        }

        Ok(())
    }

    pub async fn account_profile(&self, account_id: i64) -> Result<Account, AuthError> {
        self.fetch_account(account_id).await
    }

    async fn insert_account(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: Option<String>,
        first_name: &str,
        last_name: &str,
    ) -> Result<Account, AuthError> {
        let now = Utc::now().to_rfc3339();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO accounts (public_id, email, first_name, last_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(email.as_deref())
        .bind(first_name)
        .bind(last_name)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query("SELECT id FROM accounts WHERE public_id = ?")
            .bind(&public_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(Account {
            id: row.try_get("id")?,
            public_id,
            email,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
        })
    }

    async fn insert_default_team(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        account_id: i64,
    ) -> Result<(), AuthError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO teams (public_id, name, leader_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(DEFAULT_TEAM_NAME)
        .bind(account_id)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        let team_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO team_members (team_id, account_id, joined_at) VALUES (?, ?, ?)")
            .bind(team_id)
            .bind(account_id)
            .bind(&now)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn fetch_account(&self, id: i64) -> Result<Account, AuthError> {
        let row = sqlx::query(
            "SELECT id, public_id, email, first_name, last_name FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        map_account_row(row)
    }

    async fn fetch_account_tx(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        id: i64,
    ) -> Result<Account, AuthError> {
        let row = sqlx::query(
            "SELECT id, public_id, email, first_name, last_name FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        map_account_row(row)
    }

    async fn issue_session(&self, account_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (account_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            account_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

fn map_account_row(row: sqlx::sqlite::SqliteRow) -> Result<Account, AuthError> {
    Ok(Account {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn new_public_id() -> String {
    CUID.create_id()
}

#[derive(Clone)]
struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    fn from_config(config: &GoogleAuthConfig) -> Option<Self> {
        let client_id = config.client_id.clone()?;
        let client_secret = config.client_secret.clone()?;
        Some(Self::new(client_id, client_secret))
    }

    fn new(client_id: String, client_secret: String) -> Self {
        let client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string()).expect("invalid google auth url"),
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).expect("invalid google token url")),
        );

        let http = reqwest::Client::builder()
            .user_agent("huddle-backend")
            .build()
            .expect("failed to build google http client");

        Self { client, http }
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> anyhow::Result<String> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for google oauth")?;

        let (url, _) = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .authorize_url(|| CsrfToken::new(state.to_owned()))
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url();

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> anyhow::Result<GoogleProfile> {
        let redirect = RedirectUrl::new(redirect_uri.to_owned())
            .context("invalid redirect uri for google oauth")?;

        let token_response = self
            .client
            .clone()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(async_http_client)
            .await
            .context("failed to exchange google oauth code")?;

        let access_token = token_response.access_token().secret();

        let user: GoogleUserinfoResponse = self
            .http
            .get(GOOGLE_USERINFO_API)
            .bearer_auth(access_token)
            .send()
            .await
            .context("failed to call google userinfo api")?
            .error_for_status()
            .context("google userinfo api returned error")?
            .json()
            .await
            .context("failed to decode google userinfo response")?;

        debug!(id = %user.id, "fetched google user profile");

        Ok(GoogleProfile {
            id: user.id,
            email: user.email,
            first_name: user.given_name,
            last_name: user.family_name,
        })
    }
}

#[derive(Deserialize)]
struct GoogleUserinfoResponse {
    id: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}
