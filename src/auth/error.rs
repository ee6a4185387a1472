use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Business errors for the auth flow, mapped to HTTP at the handler
/// boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already in use")]
    Conflict,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    /// Lookup miss on the OTP verification path; reported as a 400 there,
    /// unlike the profile lookup's 404.
    #[error("User not found")]
    OtpUserNotFound,
    #[error("Invalid OTP")]
    InvalidOtp,
    #[error("OTP expired")]
    ExpiredOtp,
    #[error("internal error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Internal(err)
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // The source error is logged server-side only; clients get a
            // generic message.
            AuthError::Internal(e) => {
                error!(error = %e, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
