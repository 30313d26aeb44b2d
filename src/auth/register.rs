use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::{password::hash_password, AuthError, AuthService, Registration};
use crate::store::{NewAccount, StoreError};

const MISSING_FIELDS: &str = "Please fill in all required fields";
const HASH_FAILED: &str = "Failed to secure password";
const INVALID_DATA: &str = "Registration failed: invalid data provided";
const FETCH_FAILED: &str = "Failed to fetch created user";
const TOKEN_FAILED: &str = "Internal server error: token generation failed";

/// Sign-up payload. Absent fields deserialize as empty and are caught by
/// validation rather than by the JSON parser.
#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub study_level: Option<String>,
    pub field_of_study: Option<String>,
    pub year_of_study: Option<i32>,
    pub learning_goals: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RegisterRequest {
    fn missing_required(&self) -> bool {
        [
            self.email.as_str(),
            self.password.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
        ]
        .iter()
        .any(|field| field.trim().is_empty())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AuthService {
    /// Create an account and sign it in.
    ///
    /// # Errors
    /// * [`AuthError::Validation`] for missing required fields or a rejected write
    /// * [`AuthError::Conflict`] when the email or phone number is taken
    /// * [`AuthError::Internal`] when hashing, the read-back, or signing fails
    #[instrument(skip(self, request), fields(email = %request.email.trim()))]
    pub async fn register(&self, request: RegisterRequest) -> Result<Registration, AuthError> {
        if request.missing_required() {
            return Err(AuthError::Validation(MISSING_FIELDS));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| {
                error!("Password hashing task failed: {err}");
                AuthError::Internal(HASH_FAILED)
            })?
            .map_err(|err| {
                error!("Failed to hash password: {err}");
                AuthError::Internal(HASH_FAILED)
            })?;

        let email = request.email.trim().to_string();
        let account = NewAccount {
            first_name: request.first_name,
            last_name: request.last_name,
            email: email.clone(),
            phone_number: non_blank(request.phone_number),
            country: request.country.unwrap_or_default(),
            study_level: request.study_level.unwrap_or_default(),
            field_of_study: request.field_of_study.unwrap_or_default(),
            year_of_study: request.year_of_study,
            learning_goals: non_blank(request.learning_goals),
            password_hash,
        };

        match self.store().create(account).await {
            Ok(id) => debug!(account_id = %id, "Account created"),
            Err(StoreError::Conflict) => return Err(AuthError::Conflict),
            Err(err) => {
                error!("Failed to create account: {err}");
                return Err(AuthError::Validation(INVALID_DATA));
            }
        }

        // Read back so the response carries store-assigned id and timestamps.
        let account = match self.store().find_by_email(&email).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                error!("Created account not found on read-back");
                return Err(AuthError::Internal(FETCH_FAILED));
            }
            Err(err) => {
                error!("Failed to read back created account: {err}");
                return Err(AuthError::Internal(FETCH_FAILED));
            }
        };

        let token = self.tokens().issue(account.id, Utc::now()).map_err(|err| {
            error!("Failed to issue token: {err}");
            AuthError::Internal(TOKEN_FAILED)
        })?;

        Ok(Registration {
            message: format!("Welcome, {}!", account.first_name),
            token,
            user: account.sanitize(),
        })
    }
}
