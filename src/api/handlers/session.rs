//! Endpoints behind the access gate.

use crate::{
    auth::{clear_session_cookie, error::ErrorBody, AuthService, CurrentUser, LogoutAck},
    store::SanitizedAccount,
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub user: SanitizedAccount,
}

#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "The authenticated account", body = UserResponse),
        (status = 401, description = "Missing, malformed or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    Json(UserResponse { user })
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Client should discard its token", body = LogoutAck),
        (status = 401, description = "Missing, malformed or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    auth: Extension<Arc<AuthService>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    info!(account_id = %user.id, "Logged out");

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&clear_session_cookie()) {
        Ok(value) => {
            headers.insert(SET_COOKIE, value);
        }
        Err(err) => error!("Failed to build logout cookie header: {err}"),
    }

    (headers, Json(auth.logout()))
}
