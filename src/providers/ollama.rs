//! Ollama backend for self-hosted models.
//!
//! Text prompts go to `/api/generate`; prompts with an image go to
//! `/api/chat` with the image attached to the user message.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::check_status;
use super::traits::GenerativeBackend;
use crate::types::{GenerateOptions, GenerationRequest};
use crate::{Result, SouschefError};

/// Default local Ollama address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default vision-capable model.
pub const DEFAULT_MODEL: &str = "llava";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 0.9;

/// Client for a local Ollama server.
#[derive(Clone)]
pub struct OllamaBackend {
    base_url: String,
    model: String,
    http: Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http: Client::new(),
        }
    }

    /// Share a preconfigured HTTP client.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| SouschefError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl GenerativeBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.model.trim().is_empty()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if !self.is_available() {
            return Err(SouschefError::NotConfigured("ollama url or model".into()));
        }

        let options = OllamaOptions::from_options(request.generate_options());
        let data = match request.image() {
            None => {
                debug!(model = %self.model, "ollama generate");
                self.post(
                    "/api/generate",
                    &GenerateBody {
                        model: &self.model,
                        prompt: request.prompt(),
                        stream: false,
                        options,
                    },
                )
                .await?
            }
            Some(image) => {
                debug!(model = %self.model, "ollama chat with image");
                self.post(
                    "/api/chat",
                    &ChatBody {
                        model: &self.model,
                        messages: vec![ChatMessage {
                            role: "user",
                            content: request.prompt(),
                            images: vec![STANDARD.encode(image)],
                        }],
                        stream: false,
                        options,
                    },
                )
                .await?
            }
        };

        completion_text(&data)
    }
}

/// Pull the completion out of whichever response shape the server used.
fn completion_text(data: &Value) -> Result<String> {
    let text = data
        .get("response")
        .and_then(Value::as_str)
        .or_else(|| data.pointer("/message/content").and_then(Value::as_str))
        .or_else(|| data.get("text").and_then(Value::as_str));

    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(SouschefError::EmptyResponse),
        None => {
            let keys: Vec<&str> = data
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            warn!(?keys, "unexpected ollama response shape");
            Err(SouschefError::MalformedResponse(format!(
                "unexpected ollama response fields: {}",
                keys.join(", ")
            )))
        }
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions<'a> {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

impl<'a> OllamaOptions<'a> {
    fn from_options(options: &'a GenerateOptions) -> Self {
        Self {
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: options.top_p.unwrap_or(DEFAULT_TOP_P),
            num_predict: options.max_output_tokens,
            extra: &options.extra,
        }
    }
}
