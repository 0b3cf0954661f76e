//! Recipe suggestions, recipe details, and personalization.

use std::sync::Arc;

use tracing::{debug, info};

use super::prompts;
use crate::cache::{CacheKey, CacheStore};
use crate::extract;
use crate::providers::GenerativeBackend;
use crate::types::{
    CookingHistoryEntry, GenerateOptions, PersonalizedSuggestionRequest,
    PersonalizedSuggestionResponse, Recipe, RecipeDetails, RecipeDetailsRequest,
    SuggestionRequest, SuggestionResponse, UserPreferences,
};
use crate::{Result, SouschefError};

/// Bounds on `max_results`.
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=50;

/// Accepted cooking-history ratings.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Rating at or above which a cooked recipe counts as highly rated.
const HIGH_RATING: u8 = 4;

const NEUTRAL_SCORE: f64 = 0.5;
const PREFERENCES_ONLY_SCORE: f64 = 0.7;

const GENERIC_REASON: &str = "Based on your available ingredients and preferences";

/// Generate, filter and rank recipes.
pub struct RecipeService {
    backend: Arc<dyn GenerativeBackend>,
    cache: CacheStore,
}

impl RecipeService {
    pub fn new(backend: Arc<dyn GenerativeBackend>, cache: CacheStore) -> Self {
        Self { backend, cache }
    }

    /// Suggest recipes for the given ingredients.
    ///
    /// Cached for the store's default TTL under a fingerprint of the whole
    /// request.
    pub async fn suggest_recipes(&self, request: &SuggestionRequest) -> Result<SuggestionResponse> {
        validate_ingredients(&request.ingredients)?;
        validate_max_results(request.max_results)?;

        let key = CacheKey::new("recipes")
            .named("ingredients", &request.ingredients)
            .named("filters", serde_json::to_value(&request.filters)?)
            .named("max_results", request.max_results)
            .build();
        if let Some(cached) = self.cache.get::<SuggestionResponse>(&key).await {
            debug!(key, "suggestions served from cache");
            return Ok(cached);
        }

        let text = self
            .backend
            .generate_text(&prompts::suggestion(request), &GenerateOptions::default())
            .await?;
        let mut recipes = parse_recipes(&text)?;
        if let Some(filters) = &request.filters {
            recipes = filters.apply(recipes);
        }
        rank(&mut recipes, request.max_results);

        let response = SuggestionResponse {
            total_results: recipes.len(),
            recipes,
        };
        self.cache.set(&key, &response).await;
        info!(count = response.total_results, "suggested recipes");
        Ok(response)
    }

    /// Generate a full recipe by name.
    pub async fn generate_recipe_details(
        &self,
        request: &RecipeDetailsRequest,
    ) -> Result<RecipeDetails> {
        if request.recipe_name.trim().is_empty() {
            return Err(SouschefError::InvalidInput("recipe_name must not be empty".into()));
        }
        validate_ingredients(&request.ingredients)?;
        if request.servings < 1 {
            return Err(SouschefError::InvalidInput("servings must be at least 1".into()));
        }

        let key = CacheKey::new("recipe_details")
            .named("recipe_name", request.recipe_name.trim().to_lowercase())
            .named("ingredients", &request.ingredients)
            .named("servings", request.servings)
            .named("cooking_time", request.cooking_time)
            .build();
        if let Some(cached) = self.cache.get::<RecipeDetails>(&key).await {
            debug!(key, "recipe details served from cache");
            return Ok(cached);
        }

        let text = self
            .backend
            .generate_text(&prompts::recipe_details(request), &GenerateOptions::default())
            .await?;
        let record = extract::extract_object(&text)?;
        let details = RecipeDetails::from_record(&record, request);

        self.cache.set(&key, &details).await;
        Ok(details)
    }

    /// Suggest recipes shaped by the user's history and preferences.
    ///
    /// Not cached: history and preferences make every request unique.
    pub async fn personalize_suggestions(
        &self,
        request: &PersonalizedSuggestionRequest,
    ) -> Result<PersonalizedSuggestionResponse> {
        validate_ingredients(&request.ingredients)?;
        validate_max_results(request.max_results)?;
        validate_history(&request.cooking_history)?;

        let text = self
            .backend
            .generate_text(&prompts::personalized(request), &GenerateOptions::default())
            .await?;
        let mut recipes = parse_recipes(&text)?;
        rank(&mut recipes, request.max_results);

        let history = &request.cooking_history;
        let preferences = request.preferences.as_ref();
        Ok(PersonalizedSuggestionResponse {
            recipes,
            personalization_score: personalization_score(history, preferences),
            recommendation_reason: Some(recommendation_reason(history, preferences)),
        })
    }
}

fn validate_ingredients(ingredients: &[String]) -> Result<()> {
    if ingredients.is_empty() {
        return Err(SouschefError::InvalidInput(
            "at least one ingredient is required".into(),
        ));
    }
    if ingredients.iter().any(|i| i.trim().is_empty()) {
        return Err(SouschefError::InvalidInput(
            "ingredient names must not be blank".into(),
        ));
    }
    Ok(())
}

fn validate_max_results(n: usize) -> Result<()> {
    if !MAX_RESULTS_RANGE.contains(&n) {
        return Err(SouschefError::InvalidInput(format!(
            "max_results must be between {} and {}",
            MAX_RESULTS_RANGE.start(),
            MAX_RESULTS_RANGE.end()
        )));
    }
    Ok(())
}

fn validate_history(history: &[CookingHistoryEntry]) -> Result<()> {
    if let Some(entry) = history.iter().find(|e| !RATING_RANGE.contains(&e.rating)) {
        return Err(SouschefError::InvalidInput(format!(
            "rating for recipe {} must be between {} and {}, got {}",
            entry.recipe_id,
            RATING_RANGE.start(),
            RATING_RANGE.end(),
            entry.rating
        )));
    }
    Ok(())
}

fn parse_recipes(text: &str) -> Result<Vec<Recipe>> {
    let records = extract::json_records(text).ok_or_else(|| {
        SouschefError::MalformedResponse("no recipe list in model output".into())
    })?;
    Ok(records
        .iter()
        .enumerate()
        .map(|(i, record)| Recipe::from_record(record, i))
        .collect())
}

/// Stable sort by match percentage, best first, then truncate.
fn rank(recipes: &mut Vec<Recipe>, max_results: usize) {
    recipes.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));
    recipes.truncate(max_results);
}

/// 0.5 with nothing to go on, mean rating / 5 with history, 0.7 with
/// preferences alone.
pub fn personalization_score(
    history: &[CookingHistoryEntry],
    preferences: Option<&UserPreferences>,
) -> f64 {
    if !history.is_empty() {
        let total: f64 = history.iter().map(|h| f64::from(h.rating)).sum();
        return (total / history.len() as f64 / 5.0).min(1.0);
    }
    if preferences.is_some() {
        PREFERENCES_ONLY_SCORE
    } else {
        NEUTRAL_SCORE
    }
}

pub fn recommendation_reason(
    history: &[CookingHistoryEntry],
    preferences: Option<&UserPreferences>,
) -> String {
    let mut reasons = Vec::new();
    if let Some(prefs) = preferences
        && !prefs.cuisine_preferences.is_empty()
    {
        reasons.push(format!(
            "Based on your preference for {} cuisine",
            prefs.cuisine_preferences.join(", ")
        ));
    }
    if history.iter().any(|h| h.rating >= HIGH_RATING) {
        reasons.push("similar to recipes you've highly rated".to_string());
    }
    if reasons.is_empty() {
        return GENERIC_REASON.to_string();
    }
    format!("{}.", reasons.join(", "))
}
