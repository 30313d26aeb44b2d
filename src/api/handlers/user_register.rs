use crate::auth::{error::ErrorBody, AuthError, AuthService, RegisterRequest, Registration};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Account created and signed in", body = Registration, content_type = "application/json"),
        (status = 400, description = "Missing fields or invalid payload", body = ErrorBody),
        (status = 409, description = "Email or phone number already registered", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth, payload))]
pub async fn register(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::Validation("Invalid request body").into_response();
    };

    match auth.register(request).await {
        Ok(registration) => {
            info!(account_id = %registration.user.id, "Account registered");
            (StatusCode::CREATED, Json(registration)).into_response()
        }
        Err(err) => err.into_response(),
    }
}
