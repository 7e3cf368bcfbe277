//! Error type for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::mailer::EmailError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Username or email already taken
    #[error("{0}")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid verification code")]
    InvalidCode,

    /// Email not confirmed yet; the id lets the client resume verification
    #[error("Email not verified. Check your inbox for the verification code.")]
    Unverified { account_id: Uuid },

    #[error("Too many attempts, try again later")]
    TooManyRequests,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Failed to send verification email")]
    Delivery(#[source] EmailError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal server error")]
    InternalServerError,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::Duplicate(_)
            | AuthError::InvalidCode => StatusCode::BAD_REQUEST,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::InvalidCredentials | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Unverified { .. } | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Delivery(_) | AuthError::Database(_) | AuthError::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AuthError::Unverified { account_id } => json!({
                "error": self.to_string(),
                "user_id": account_id,
            }),
            AuthError::Database(e) => {
                error!("Database failure: {}", e);
                json!({ "error": "Internal server error" })
            }
            AuthError::Delivery(e) => {
                error!("Email delivery failure: {}", e);
                json!({ "error": "Failed to send verification email. Try again later." })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
