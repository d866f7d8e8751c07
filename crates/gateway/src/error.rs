//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upstream identity provider error: {0}")]
    IdentityProviderError(String),

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::InternalError(_) | GatewayError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::IdentityProviderError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<huddle_auth::AuthError> for GatewayError {
    fn from(error: huddle_auth::AuthError) -> Self {
        use huddle_auth::AuthError;
        match error {
            AuthError::AccountExists => GatewayError::Conflict("Email already registered".to_string()),
            AuthError::InvalidCredentials => {
                GatewayError::AuthenticationFailed("Invalid credentials".to_string())
            }
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::InvalidSession => {
                GatewayError::AuthenticationFailed("Invalid or expired session".to_string())
            }
            AuthError::GoogleOauthDisabled => GatewayError::ServiceUnavailable,
            AuthError::GoogleOauth(e) => GatewayError::IdentityProviderError(e.to_string()),
            AuthError::GoogleProfileMissingEmail => {
                GatewayError::InvalidRequest("Google profile has no email".to_string())
            }
            AuthError::Database(e) => GatewayError::DatabaseError(e.to_string()),
            AuthError::PasswordHash(e) => GatewayError::InternalError(e.to_string()),
        }
    }
}

impl From<huddle_database::TeamError> for GatewayError {
    fn from(error: huddle_database::TeamError) -> Self {
        use huddle_database::TeamError;
        match error {
            TeamError::TeamNotFound => GatewayError::NotFound("Team not found".to_string()),
            TeamError::AccountNotFound => GatewayError::NotFound("Account not found".to_string()),
            TeamError::MemberNotFound => GatewayError::NotFound("Member not found".to_string()),
            TeamError::MemberAlreadyExists => {
                GatewayError::Conflict("Already a team member".to_string())
            }
            TeamError::LeaderRemoval => {
                GatewayError::InvalidRequest("The team leader cannot be removed".to_string())
            }
            TeamError::DatabaseError(msg) => GatewayError::DatabaseError(msg),
        }
    }
}

impl From<huddle_database::TaskError> for GatewayError {
    fn from(error: huddle_database::TaskError) -> Self {
        use huddle_database::TaskError;
        match error {
            TaskError::TaskNotFound => GatewayError::NotFound("Task not found".to_string()),
            TaskError::AssignmentNotFound => {
                GatewayError::NotFound("No assignment for this task".to_string())
            }
            TaskError::TeamNotFound => GatewayError::NotFound("Team not found".to_string()),
            TaskError::DatabaseError(msg) => GatewayError::DatabaseError(msg),
        }
    }
}

impl From<huddle_database::InboxError> for GatewayError {
    fn from(error: huddle_database::InboxError) -> Self {
        use huddle_database::InboxError;
        match error {
            InboxError::TeamNotFound => GatewayError::NotFound("Team not found".to_string()),
            InboxError::MessageNotFound => GatewayError::NotFound("Message not found".to_string()),
            InboxError::DatabaseError(msg) => GatewayError::DatabaseError(msg),
        }
    }
}

impl From<huddle_database::DatabaseError> for GatewayError {
    fn from(error: huddle_database::DatabaseError) -> Self {
        GatewayError::DatabaseError(error.to_string())
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        GatewayError::DatabaseError(error.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        GatewayError::InvalidRequest(format!("JSON serialization error: {}", error))
    }
}
