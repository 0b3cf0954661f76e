//! Ingredient recognition types.

use serde::{Deserialize, Serialize};

/// A recognized ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Recognition confidence, always within `0.0..=1.0`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Ingredient {
    /// Create an ingredient, clamping confidence into range.
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: clamp_confidence(confidence),
            quantity: None,
            unit: None,
        }
    }

    pub fn quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Image to recognize. Exactly one source must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Base64 payload; a `data:<mime>;base64,` prefix is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

impl RecognitionRequest {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            image_base64: None,
        }
    }

    pub fn from_base64(data: impl Into<String>) -> Self {
        Self {
            image_url: None,
            image_base64: Some(data.into()),
        }
    }
}

/// Recognized ingredients plus wall-clock processing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub ingredients: Vec<Ingredient>,
    /// Seconds, rounded to two decimals.
    pub processing_time: f64,
}
