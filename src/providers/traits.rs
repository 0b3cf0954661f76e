//! The generative backend trait.
//!
//! Backends implement only [`GenerativeBackend::generate`]; the text, vision
//! and structured entry points are provided on top of it. Decorators such as
//! [`RetryingBackend`](super::RetryingBackend) wrap an `Arc<dyn
//! GenerativeBackend>` and implement the same trait.
//!
//! # Availability
//!
//! Availability is decided when a backend is built (credentials present,
//! endpoint configured). An unavailable backend returns
//! [`SouschefError::NotConfigured`] from every call without touching the
//! network.

use async_trait::async_trait;

use crate::extract;
use crate::types::{GenerateOptions, GenerationRequest};
use crate::{Result, SouschefError};

/// A text and vision generation endpoint.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Backend name for logging and metrics.
    fn name(&self) -> &str;

    /// Whether the backend was configured well enough to be called.
    fn is_available(&self) -> bool;

    /// Run one generation and return the raw completion text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Generate from a text prompt.
    async fn generate_text(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let request = GenerationRequest::text(prompt).options(options.clone());
        self.generate(&request).await
    }

    /// Generate from a prompt and an image payload.
    async fn generate_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        options: &GenerateOptions,
    ) -> Result<String> {
        let request = GenerationRequest::with_image(prompt, image.to_vec()).options(options.clone());
        self.generate(&request).await
    }

    /// Ask for JSON matching `shape_hint` and parse the first JSON value in
    /// the reply.
    async fn generate_structured(
        &self,
        prompt: &str,
        shape_hint: &str,
    ) -> Result<serde_json::Value> {
        let prompt = format!(
            "{prompt}\n\nRespond only with valid JSON matching this structure:\n{shape_hint}"
        );
        let text = self
            .generate_text(&prompt, &GenerateOptions::default())
            .await?;
        extract::find_json(&text).ok_or_else(|| {
            SouschefError::InvalidStructuredResponse(format!(
                "no JSON value in {} chars of model output",
                text.len()
            ))
        })
    }
}
