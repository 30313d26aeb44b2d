use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use super::{
    password::{verify_against_dummy, verify_password},
    AuthError, AuthService, Rejection, Session,
};

const TOKEN_FAILED: &str = "Login failed: could not issue token";

#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl AuthService {
    /// Check credentials and return a new session.
    ///
    /// Unknown email, failed lookup and wrong password all produce the same
    /// [`Rejection::BadCredentials`].
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthorized`] on bad credentials and
    /// [`AuthError::Internal`] when the token cannot be issued.
    #[instrument(skip(self, request), fields(email = %request.email.trim()))]
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AuthError> {
        let account = match self.store().find_by_email(request.email.trim()).await {
            Ok(account) => account,
            Err(err) => {
                warn!("Account lookup failed: {err}");
                None
            }
        };

        let password = request.password;
        let Some(account) = account else {
            // Spend the same work as a real check before refusing.
            let _ = tokio::task::spawn_blocking(move || verify_against_dummy(&password)).await;
            return Err(Rejection::BadCredentials.into());
        };

        let stored_hash = account.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|err| {
                    error!("Password verification task failed: {err}");
                    AuthError::Internal("Internal server error")
                })?;
        if !verified {
            return Err(Rejection::BadCredentials.into());
        }

        let token = self.tokens().issue(account.id, Utc::now()).map_err(|err| {
            error!("Failed to issue token: {err}");
            AuthError::Internal(TOKEN_FAILED)
        })?;

        Ok(Session {
            token,
            user: account.sanitize(),
        })
    }
}
