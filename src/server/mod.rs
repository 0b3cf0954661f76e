//! HTTP service mode.
//!
//! An axum router exposing the recognition and suggestion services under
//! `/api/ai`, with API key authentication and per-client rate limiting.

pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::{ErrorKind, SouschefError};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl From<&SouschefError> for ErrorBody {
    fn from(err: &SouschefError) -> Self {
        Self {
            error: ErrorDetail {
                code: err.kind().code(),
                message: err.public_message(),
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for SouschefError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Internal | ErrorKind::MalformedResponse => {
                tracing::error!(error = %self, "request failed");
            }
            ErrorKind::BackendTimeout | ErrorKind::BackendUnavailable => {
                tracing::warn!(error = %self, "generative backend failure");
            }
            _ => {}
        }
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

impl From<JsonRejection> for SouschefError {
    fn from(rejection: JsonRejection) -> Self {
        SouschefError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_keeps_its_message() {
        let response = SouschefError::InvalidInput("ingredients must not be empty".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["message"],
            "invalid input: ingredients must not be empty"
        );
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let response = SouschefError::Backend("redis: secret host".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn backend_outcomes_map_to_gateway_statuses() {
        let timeout = SouschefError::BackendTimeout { attempts: 3 }.into_response();
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let unavailable = SouschefError::NotConfigured("Gemini API key".into()).into_response();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let limited = SouschefError::RateLimitExceeded {
            per_minute: 60,
            per_hour: 1000,
        }
        .into_response();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
