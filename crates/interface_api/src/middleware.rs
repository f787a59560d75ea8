//! API middleware

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use crate::auth::{validate_token, AuthError, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Validates the bearer token and stores its claims in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!(uri = %request.uri(), "Missing or invalid Authorization header");
            AuthError::MissingToken
        })?;

    let claims = validate_token(token, &state.config.jwt_secret).map_err(|e| {
        warn!(error = ?e, "Token validation failed");
        e
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Audit logging middleware
///
/// One line per API request: who called what, and how it ended. Server
/// errors are logged at warn level.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        warn!(%method, %uri, %user, status, elapsed_ms, "API request failed");
    } else {
        info!(%method, %uri, %user, status, elapsed_ms, "API request");
    }

    response
}
