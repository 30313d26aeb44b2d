//! Registration, login and the bearer-token access gate.
//!
//! Flow Overview:
//! 1) `register` validates the profile, hashes the password, persists the
//!    account and returns a fresh session token.
//! 2) `login` checks email and password and returns a session token.
//! 3) `authenticate` turns an `Authorization` header back into the current,
//!    sanitized account. The [`gate::require_auth`] middleware wraps it.
//!
//! Sessions are stateless: nothing is stored server-side, so logout only
//! tells the client to drop its token.

pub mod error;
pub mod gate;
pub mod login;
pub mod password;
pub mod register;
pub mod secret;
pub mod token;

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use utoipa::ToSchema;

use crate::store::{AccountStore, SanitizedAccount};

pub use error::{AuthError, Rejection};
pub use gate::{require_auth, CurrentUser};
pub use login::LoginRequest;
pub use register::RegisterRequest;
pub use secret::{EnvSecret, FileSecret, SecretError, SecretSource, StaticSecret};
pub use token::{Claims, TokenCodec, TokenError, TOKEN_TTL_SECONDS};

/// Name of the cookie a browser client may keep the token in.
pub const SESSION_COOKIE_NAME: &str = "afridauth";

/// A signed-in account: the bearer token plus the sanitized profile.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub token: String,
    pub user: SanitizedAccount,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.id)
            .finish_non_exhaustive()
    }
}

/// Result of a successful registration.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    pub message: String,
    pub token: String,
    pub user: SanitizedAccount,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("message", &self.message)
            .field("user", &self.user.id)
            .finish_non_exhaustive()
    }
}

/// Acknowledgement returned by logout.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutAck {
    pub message: String,
}

/// The auth core: account store plus token codec.
#[derive(Clone, Debug)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    tokens: TokenCodec,
}

impl AuthService {
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, tokens: TokenCodec) -> Self {
        Self { store, tokens }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Stateless logout. The caller should also expire the session cookie,
    /// see [`clear_session_cookie`].
    #[must_use]
    pub fn logout(&self) -> LogoutAck {
        LogoutAck {
            message: "Successfully logged out".to_string(),
        }
    }
}

/// `Set-Cookie` value that makes browsers drop the session cookie.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::store::{Account, AccountId, MemoryAccountStore, NewAccount, StoreError};
    use async_trait::async_trait;

    pub const TEST_SECRET: &str = "test-signing-secret";

    pub fn service() -> (AuthService, Arc<MemoryAccountStore>) {
        service_with_secret(TEST_SECRET)
    }

    pub fn service_with_secret(secret: &str) -> (AuthService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        let tokens = TokenCodec::new(Arc::new(StaticSecret::new(secret)));
        (AuthService::new(store.clone(), tokens), store)
    }

    pub fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            country: Some("KE".to_string()),
            study_level: Some("BSc".to_string()),
            field_of_study: Some("CS".to_string()),
            ..RegisterRequest::default()
        }
    }

    /// Store that accepts writes but never finds anything, or fails outright.
    #[derive(Debug, Default)]
    pub struct FaultyStore {
        pub fail_create: bool,
        pub fail_lookup: bool,
    }

    impl FaultyStore {
        fn lookup(&self) -> Result<Option<Account>, StoreError> {
            if self.fail_lookup {
                Err(StoreError::Unavailable("lookups disabled".to_string()))
            } else {
                Ok(None)
            }
        }
    }

    #[async_trait]
    impl AccountStore for FaultyStore {
        async fn create(&self, _account: NewAccount) -> Result<AccountId, StoreError> {
            if self.fail_create {
                Err(StoreError::Unavailable("writes disabled".to_string()))
            } else {
                Ok(AccountId(1))
            }
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            self.lookup()
        }

        async fn find_by_id(&self, _id: AccountId) -> Result<Option<Account>, StoreError> {
            self.lookup()
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.lookup().map(|_| ())
        }
    }
}
