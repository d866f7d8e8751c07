//! Account registration, login, and Google OAuth endpoints

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::{extract_bearer_token, CurrentAccount};
use crate::state::GatewayState;

pub fn public_routes() -> Router<GatewayState> {
    Router::new()
        .route("/api/accounts", post(create_account))
        .route("/api/accounts/login", post(login))
        .route("/api/accounts/google/login", get(google_login))
        .route("/api/accounts/google/callback", post(google_callback))
}

pub fn protected_routes() -> Router<GatewayState> {
    Router::new()
        .route("/api/accounts/logout", post(logout))
        .route("/api/accounts/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginQuery {
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginResponse {
    pub authorize_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackRequest {
    pub code: String,
    pub state: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountResponse,
    pub expires_at: String,
}

impl SessionResponse {
    fn new(session: huddle_auth::AuthSession, account: huddle_auth::Account) -> Self {
        Self {
            token: session.token,
            account: account.into(),
            expires_at: session.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl From<huddle_auth::Account> for AccountResponse {
    fn from(account: huddle_auth::Account) -> Self {
        Self {
            id: account.public_id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
        }
    }
}

/// Register a local account and log it straight in, the way the signup form
/// expects.
pub async fn create_account(
    State(state): State<GatewayState>,
    Json(payload): Json<CreateAccountRequest>,
) -> GatewayResult<(StatusCode, Json<SessionResponse>)> {
    let email = payload.email.trim();
    let password = payload.password.as_str();
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    if email.is_empty() || password.is_empty() || first_name.is_empty() || last_name.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "All fields are required".to_string(),
        ));
    }

    state
        .authenticator
        .register_with_password(email, password, first_name, last_name)
        .await?;

    let session = state
        .authenticator
        .login_with_password(email, password)
        .await?;
    let account = state
        .authenticator
        .account_profile(session.account_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(session, account)),
    ))
}

pub async fn login(
    State(state): State<GatewayState>,
    Json(payload): Json<LoginRequest>,
) -> GatewayResult<Json<SessionResponse>> {
    let session = state
        .authenticator
        .login_with_password(payload.email.trim(), &payload.password)
        .await?;
    let account = state
        .authenticator
        .account_profile(session.account_id)
        .await?;

    Ok(Json(SessionResponse::new(session, account)))
}

pub async fn logout(State(state): State<GatewayState>, request: Request) -> GatewayResult<()> {
    let token = extract_bearer_token(&request)?;
    state.authenticator.revoke_session(&token).await?;
    Ok(())
}

pub async fn me(
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Json<AccountResponse> {
    Json(AccountResponse::from(account))
}

pub async fn google_login(
    State(state): State<GatewayState>,
    Query(params): Query<GoogleLoginQuery>,
) -> GatewayResult<Json<GoogleLoginResponse>> {
    if !state.authenticator.google_enabled() {
        return Err(GatewayError::ServiceUnavailable);
    }

    let oauth_state = state.oauth_state.issue().await;
    let authorize_url = match state
        .authenticator
        .google_authorization_url(&oauth_state, &params.redirect_uri)
    {
        Ok(url) => url,
        Err(err) => {
            state.oauth_state.consume(&oauth_state).await;
            return Err(GatewayError::from(err));
        }
    };

    Ok(Json(GoogleLoginResponse { authorize_url }))
}

pub async fn google_callback(
    State(state): State<GatewayState>,
    Json(payload): Json<GoogleCallbackRequest>,
) -> GatewayResult<Json<SessionResponse>> {
    if !state.oauth_state.consume(&payload.state).await {
        return Err(GatewayError::InvalidRequest(
            "invalid or expired OAuth state".to_string(),
        ));
    }

    let session = state
        .authenticator
        .login_with_google_code(&payload.code, &payload.redirect_uri)
        .await?;
    let account = state
        .authenticator
        .account_profile(session.account_id)
        .await?;

    Ok(Json(SessionResponse::new(session, account)))
}
