//! HTTP handlers. Each one is a thin adapter from axum extractors to the
//! [`AuthService`](crate::auth::AuthService) flows.

pub mod health;
pub mod root;
pub mod session;
pub mod user_login;
pub mod user_register;
