//! In-process account store.
//!
//! All state sits behind one async mutex, so the uniqueness check and the
//! insert happen atomically just like a unique index would make them.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{Account, AccountId, AccountStore, NewAccount, StoreError};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    accounts: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    account: Account,
    deleted: bool,
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: Mutex<State>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account deleted; lookups stop returning it and its email and
    /// phone number become available again.
    pub async fn soft_delete(&self, id: AccountId) -> bool {
        let mut state = self.state.lock().await;
        match state
            .accounts
            .iter_mut()
            .find(|entry| !entry.deleted && entry.account.id == id)
        {
            Some(entry) => {
                entry.deleted = true;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.accounts.iter().filter(|entry| !entry.deleted).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> Result<AccountId, StoreError> {
        let mut state = self.state.lock().await;

        let taken = state.accounts.iter().filter(|entry| !entry.deleted).any(|entry| {
            entry.account.email == account.email
                || (account.phone_number.is_some()
                    && entry.account.phone_number == account.phone_number)
        });
        if taken {
            return Err(StoreError::Conflict);
        }

        state.next_id += 1;
        let id = AccountId(state.next_id);
        let now = Utc::now();
        state.accounts.push(Entry {
            account: Account {
                id,
                first_name: account.first_name,
                last_name: account.last_name,
                email: account.email,
                phone_number: account.phone_number,
                country: account.country,
                study_level: account.study_level,
                field_of_study: account.field_of_study,
                year_of_study: account.year_of_study,
                learning_goals: account.learning_goals,
                password_hash: account.password_hash,
                created_at: now,
                updated_at: now,
            },
            deleted: false,
        });

        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|entry| !entry.deleted && entry.account.email == email)
            .map(|entry| entry.account.clone()))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|entry| !entry.deleted && entry.account.id == id)
            .map(|entry| entry.account.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
