//! Types for text and vision generation requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options for a single generation call.
///
/// Backends translate the typed fields into their own parameter names;
/// `extra` carries anything backend-specific verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Additional scalar options passed through unchanged.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top_p.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the output token limit.
    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    /// Add a backend-specific scalar option.
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// A prompt, an optional image, and options. Built once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    image: Option<Vec<u8>>,
    options: GenerateOptions,
}

impl GenerationRequest {
    /// Text-only request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            options: GenerateOptions::default(),
        }
    }

    /// Request carrying an image payload (normalized JPEG bytes).
    pub fn with_image(prompt: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
            options: GenerateOptions::default(),
        }
    }

    /// Replace the options.
    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn generate_options(&self) -> &GenerateOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder_sets_fields() {
        let opts = GenerateOptions::new()
            .temperature(0.7)
            .top_p(0.9)
            .max_output_tokens(512)
            .extra("num_ctx", 4096);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.top_p, Some(0.9));
        assert_eq!(opts.max_output_tokens, Some(512));
        assert_eq!(opts.extra.get("num_ctx"), Some(&serde_json::json!(4096)));
    }

    #[test]
    fn empty_options_serialize_to_empty_object() {
        let json = serde_json::to_string(&GenerateOptions::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn request_with_image_exposes_payload() {
        let req = GenerationRequest::with_image("what is this?", vec![1, 2, 3]);
        assert_eq!(req.prompt(), "what is this?");
        assert_eq!(req.image(), Some(&[1u8, 2, 3][..]));
        assert!(GenerationRequest::text("hi").image().is_none());
    }
}
