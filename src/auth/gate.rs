//! Access gate for protected routes.
//!
//! Flow Overview:
//! 1) Require `Authorization: Bearer <token>` exactly.
//! 2) Verify the token against the current secret and clock.
//! 3) Re-resolve the account so deleted users lose access immediately.
//! 4) Attach the sanitized account to the request as [`CurrentUser`].

use axum::{
    extract::{Extension, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error};

use super::{AuthError, AuthService, Rejection, TokenError};
use crate::store::SanitizedAccount;

/// The authenticated account, inserted into request extensions by
/// [`require_auth`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub SanitizedAccount);

impl AuthService {
    /// Resolve an `Authorization` header value to the current account.
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthorized`] with the failing check, or
    /// [`AuthError::Internal`] if the secret or the store is unavailable.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<SanitizedAccount, AuthError> {
        self.authenticate_at(authorization, Utc::now()).await
    }

    /// [`authenticate`](Self::authenticate) with an explicit clock.
    ///
    /// # Errors
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn authenticate_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SanitizedAccount, AuthError> {
        let token = bearer_token(authorization)?;

        let claims = self.tokens().verify(token, now).map_err(|err| match err {
            TokenError::MissingSubject | TokenError::InvalidSubject => {
                AuthError::from(Rejection::InvalidSubject)
            }
            err if err.is_rejection() => {
                debug!("Rejected token: {err}");
                AuthError::from(Rejection::InvalidToken)
            }
            err => {
                error!("Failed to verify token: {err}");
                AuthError::Internal("Internal server error")
            }
        })?;

        match self.store().find_by_id(claims.sub).await {
            Ok(Some(account)) => Ok(account.sanitize()),
            Ok(None) => Err(Rejection::UnknownUser.into()),
            Err(err) => {
                error!("Failed to resolve account {}: {err}", claims.sub);
                Err(AuthError::Internal("Internal server error"))
            }
        }
    }
}

fn bearer_token(authorization: Option<&str>) -> Result<&str, Rejection> {
    let header = match authorization {
        None | Some("") => return Err(Rejection::MissingToken),
        Some(header) => header,
    };

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(Rejection::InvalidFormat),
    }
}

/// Middleware for protected routes; needs `Extension<Arc<AuthService>>`.
pub async fn require_auth(
    Extension(auth): Extension<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(_) => return AuthError::from(Rejection::InvalidFormat).into_response(),
        },
    };

    match auth.authenticate(authorization.as_deref()).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
