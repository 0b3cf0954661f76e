//! Request admission: API key authentication and rate limiting.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use crate::SouschefError;
use crate::limiter::ClientIdentity;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the caller presented the service API key.
///
/// With no key configured every request is admitted (development mode)
/// and the extractor carries whatever key was sent, if any.
#[derive(Debug, Clone)]
pub struct ApiKey(pub Option<String>);

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = SouschefError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = presented_key(&parts.headers);

        let Some(expected) = state.api_key.as_deref() else {
            return Ok(ApiKey(presented.map(String::from)));
        };

        let presented = presented.ok_or_else(|| {
            SouschefError::Unauthorized(
                "API key required. Please provide X-API-Key header.".into(),
            )
        })?;

        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            warn!(path = %parts.uri.path(), "invalid API key");
            return Err(SouschefError::Unauthorized("Invalid API key".into()));
        }

        Ok(ApiKey(Some(presented.to_string())))
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Who a request counts against.
///
/// A key only names the bucket once it matches `expected`; anything else,
/// including every key in development mode, counts against the peer.
pub fn client_identity(request: &Request, expected: Option<&str>) -> ClientIdentity {
    if let Some(expected) = expected
        && let Some(key) = presented_key(request.headers())
        && constant_time_eq(key.as_bytes(), expected.as_bytes())
    {
        return ClientIdentity::api_key(key);
    }
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    ClientIdentity::ip(peer)
}

/// Reject requests over the configured thresholds with 429.
///
/// Exempt paths skip the limiter entirely and are not counted.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let identity = client_identity(&request, state.api_key.as_deref());
    match state.limiter.check(&identity).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(identity = %identity, path = %request.uri().path(), "rate limit exceeded");
            e.into_response()
        }
    }
}
