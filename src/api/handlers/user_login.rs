use crate::auth::{error::ErrorBody, AuthError, AuthService, LoginRequest, Session};
use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Signed in", body = Session, content_type = "application/json"),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Invalid request format").into_response();
    };

    match auth.login(request).await {
        Ok(session) => {
            info!(account_id = %session.user.id, "Signed in");
            Json(session).into_response()
        }
        Err(err) => err.into_response(),
    }
}
