//! Generative backends.
//!
//! [`GeminiBackend`] talks to Google's hosted Generative Language API with an
//! API key; [`OllamaBackend`] talks to a self-hosted Ollama server. Both are
//! wrapped in a [`RetryingBackend`] before use.

pub mod gemini;
pub mod ollama;
pub mod retry;
pub mod traits;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use retry::{RetryConfig, RetryingBackend};
pub use traits::GenerativeBackend;

use crate::{Result, SouschefError};

/// Longest error body excerpt kept in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Turn a non-success response into an error, keeping a short body excerpt.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if matches!(status.as_u16(), 401 | 403) {
        return Err(SouschefError::AuthenticationFailed);
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    Err(SouschefError::Api {
        status: status.as_u16(),
        message: if excerpt.is_empty() {
            status.to_string()
        } else {
            excerpt
        },
    })
}
