//! Account records and the store contract consumed by the auth flows.
//!
//! The store owns uniqueness: email is unique across non-deleted accounts and
//! the phone number is unique only when present. Flows never check for
//! duplicates themselves; they rely on [`StoreError::Conflict`] so that two
//! concurrent registrations resolve to exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Numeric account identifier assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted account, including its password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub country: String,
    pub study_level: String,
    pub field_of_study: String,
    pub year_of_study: Option<i32>,
    pub learning_goals: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Drop the password hash, producing the view that may leave the server.
    #[must_use]
    pub fn sanitize(self) -> SanitizedAccount {
        SanitizedAccount {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            country: self.country,
            study_level: self.study_level,
            field_of_study: self.field_of_study,
            year_of_study: self.year_of_study,
            learning_goals: self.learning_goals,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Never print the hash, not even in debug logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Account fields returned to clients and attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SanitizedAccount {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub country: String,
    pub study_level: String,
    pub field_of_study: String,
    pub year_of_study: Option<i32>,
    pub learning_goals: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when creating an account.
///
/// `phone_number` is `None` when the submitted value was blank; stores must
/// then leave the column out of the write entirely.
#[derive(Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub country: String,
    pub study_level: String,
    pub field_of_study: String,
    pub year_of_study: Option<i32>,
    pub learning_goals: Option<String>,
    pub password_hash: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Email or phone number already belongs to another account.
    #[error("account already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract for accounts.
///
/// Lookups return `Ok(None)` for missing (or soft-deleted) accounts so callers
/// can tell "not found" apart from a failing store.
#[async_trait]
pub trait AccountStore: Send + Sync + fmt::Debug {
    /// Insert a new account and return its identifier.
    async fn create(&self, account: NewAccount) -> Result<AccountId, StoreError>;

    /// Exact, case-sensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Connectivity check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
