use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Why a caller was refused. Each variant renders one fixed public message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid token format")]
    InvalidFormat,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid token subject")]
    InvalidSubject,
    #[error("User no longer exists")]
    UnknownUser,
    /// Shared by unknown email and wrong password.
    #[error("Invalid email or password")]
    BadCredentials,
}

/// Failures returned by the registration, login and access-gate flows.
///
/// The `Display` output is exactly what the client sees; internal causes are
/// logged where they happen and never carried here.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("This email or phone is already registered")]
    Conflict,
    #[error("{0}")]
    Unauthorized(Rejection),
    #[error("{0}")]
    Internal(&'static str),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Rejection> for AuthError {
    fn from(rejection: Rejection) -> Self {
        Self::Unauthorized(rejection)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
