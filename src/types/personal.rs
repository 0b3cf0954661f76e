//! Personalized suggestion types.

use serde::{Deserialize, Serialize};

use super::Recipe;

/// A recipe the user cooked, with their rating (1–5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingHistoryEntry {
    pub recipe_id: String,
    pub rating: u8,
    pub cooked_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<String>,
}

fn default_max_results() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedSuggestionRequest {
    pub ingredients: Vec<String>,
    pub user_id: String,
    /// Most recent first.
    #[serde(default)]
    pub cooking_history: Vec<CookingHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedSuggestionResponse {
    pub recipes: Vec<Recipe>,
    /// 0.0–1.0.
    pub personalization_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_reason: Option<String>,
}
