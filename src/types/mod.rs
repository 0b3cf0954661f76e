//! Public types for the Souschef API.

mod generate;
mod ingredient;
mod personal;
mod recipe;

pub use generate::{GenerateOptions, GenerationRequest};
pub use ingredient::{Ingredient, RecognitionRequest, RecognitionResponse};
pub use personal::{
    CookingHistoryEntry, PersonalizedSuggestionRequest, PersonalizedSuggestionResponse,
    UserPreferences,
};
pub use recipe::{
    NutritionInfo, Recipe, RecipeDetails, RecipeDetailsRequest, RecipeFilters, RecipeIngredient,
    RecipeInstruction, SuggestionRequest, SuggestionResponse,
};

/// Loosely typed record pulled out of model output.
pub type Record = serde_json::Map<String, serde_json::Value>;
