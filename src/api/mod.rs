//! HTTP surface: routes, middleware stack and the server loop.

use crate::auth::{require_auth, AuthService};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{health, root, session, user_login, user_register};

const REQUEST_ID: &str = "x-request-id";

/// Origin allowed by CORS when none is configured.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Build the application router.
///
/// `/api/auth/*` sits behind [`require_auth`]; everything else is public.
pub fn router(auth: Arc<AuthService>) -> Router {
    let protected = Router::new()
        .route("/api/auth/user", get(session::current_user))
        .route("/api/auth/logout", post(session::logout))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/api/signup", post(user_register::register))
        .route("/api/login", post(user_login::login))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth)),
        )
}

/// Serve `auth` on `port` until Ctrl-C.
///
/// # Errors
/// Return error if the origins are invalid or the listener fails
pub async fn new(port: u16, auth: Arc<AuthService>, cors_origins: &[String]) -> Result<()> {
    let app = router(auth).layer(cors(cors_origins)?);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// CORS policy for the configured allow-list.
///
/// # Errors
/// Return error if any entry is not an absolute http(s) URL with a host
pub fn cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = if origins.is_empty() {
        vec![origin(DEFAULT_CORS_ORIGIN)?]
    } else {
        origins
            .iter()
            .map(|value| origin(value))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(CorsLayer::new()
        .allow_headers([ORIGIN, CONTENT_TYPE, ACCEPT, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

// Browsers send the bare origin, so drop any path and keep an explicit port.
fn origin(url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(url.trim()).with_context(|| format!("Invalid CORS origin: {url}"))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("CORS origin must include a host: {url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path_and_keeps_port() -> Result<()> {
        assert_eq!(origin("http://localhost:5173/app/")?, "http://localhost:5173");
        assert_eq!(
            origin("https://traders.kazini.africa")?,
            "https://traders.kazini.africa"
        );
        Ok(())
    }

    #[test]
    fn origin_rejects_garbage() {
        assert!(origin("not a url").is_err());
        assert!(origin("mailto:someone@example.com").is_err());
    }

    #[test]
    fn cors_accepts_defaults_and_lists() {
        assert!(cors(&[]).is_ok());
        assert!(cors(&["http://localhost:5173".to_string(), "https://a.example".to_string()]).is_ok());
        assert!(cors(&["::".to_string()]).is_err());
    }
}
