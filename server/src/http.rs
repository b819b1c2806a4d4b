//! HTTP router and handlers.
//!
//! Routes:
//!
//! - `GET /api/applications`: JSON array of registered application names.
//!   Requires an authenticated user, like the token route.
//! - `GET /api/token/{app}`: `{"token": "..."}` for the authenticated user.
//!
//! Failures are returned as `{"error": "..."}` with `400 Bad Request`, or
//! `500 Internal Server Error` when signing itself fails.
//!
//! # Identity
//!
//! This service does not authenticate users. It must run behind a front end
//! (an authenticating reverse proxy or identity-aware gateway) that performs
//! the login flow and forwards the verified user in the
//! `X-Authenticated-Email` and `X-Authenticated-Image-Url` headers. The
//! identity middleware moves them into the request extensions, where the
//! [`Identity`] extractor picks them up.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::{Body, HttpBody},
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, Request, StatusCode, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Identity, IssueError, TokenIssuer};

/// Header carrying the authenticated user's email.
pub const EMAIL_HEADER: &str = "x-authenticated-email";
/// Header carrying the authenticated user's avatar URL.
pub const IMAGE_URL_HEADER: &str = "x-authenticated-image-url";

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error: String,
}

/// Successful token response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Create the router.
pub fn create_router(issuer: Arc<TokenIssuer>) -> Router {
    Router::new()
        .route("/api/applications", get(list_applications))
        .route("/api/token/{app}", get(get_application_token))
        .layer(middleware::from_fn(identity_middleware))
        .layer(middleware::from_fn(request_log_middleware))
        .with_state(issuer)
}

/// GET /api/applications
///
/// Only authenticated users may see which applications are registered.
async fn list_applications(
    State(issuer): State<Arc<TokenIssuer>>,
    _identity: Identity,
) -> Json<Vec<String>> {
    Json(issuer.list_applications())
}

/// GET /api/token/{app}
///
/// If the application has no authorization file, the level is "noauth".
async fn get_application_token(
    State(issuer): State<Arc<TokenIssuer>>,
    identity: Identity,
    Path(app): Path<String>,
) -> Result<Json<TokenResponse>, IssueError> {
    let token = issuer.issue(&identity, &app).await?;
    Ok(Json(TokenResponse { token }))
}

/// Copy the forwarded identity headers into the request extensions.
///
/// Requests without a complete identity pass through untouched; handlers that
/// need one reject them.
async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    let identity = {
        let headers = request.headers();
        Identity::new(
            forwarded_header(headers, EMAIL_HEADER),
            forwarded_header(headers, IMAGE_URL_HEADER),
        )
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(_) => {
            tracing::debug!(path = %request.uri().path(), "request without complete identity");
        }
    }
    next.run(request).await
}

/// Trimmed value of a forwarded header, or empty if absent or not UTF-8.
fn forwarded_header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Log one line per request with its size and latency.
async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let uri = request.uri().clone();
    let bytes_in = request.body().size_hint().exact().unwrap_or(0);
    let started = Instant::now();

    let response = next.run(request).await;

    let bytes_out = response.body().size_hint().exact().unwrap_or(0);
    tracing::info!(
        uri = %uri,
        status = response.status().as_u16(),
        bytes_in,
        bytes_out,
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "request"
    );
    response
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = IssueError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(IssueError::IdentityIncomplete)
    }
}

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorInfo {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
