//! # Afridauth
//!
//! `afridauth` registers accounts, signs them in and gates protected routes
//! behind short-lived bearer tokens.
//!
//! ## Credentials
//!
//! Passwords are hashed with Argon2id before they reach the store and are
//! never returned. Login answers unknown emails and wrong passwords with the
//! same `401`.
//!
//! ## Sessions
//!
//! Session tokens are HS256 JWTs whose subject is the numeric account id and
//! whose expiry is 24 hours after issue. The server keeps no session state;
//! the signing secret is resolved on every token operation, so rotating it
//! invalidates outstanding tokens without a restart.
//!
//! ## Access Gate
//!
//! Protected routes re-load the account on every request, so soft-deleted
//! accounts lose access as soon as they are removed.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
