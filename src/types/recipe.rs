//! Recipe suggestion and recipe detail types.

use serde::{Deserialize, Serialize};

/// A suggested recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ingredients_required: Vec<String>,
    #[serde(default)]
    pub ingredients_missing: Vec<String>,
    /// Share of required ingredients on hand, 0–100.
    pub match_percentage: f64,
    /// Minutes.
    pub cooking_time: u32,
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub dietary_info: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Recipe {
    /// Recompute `match_percentage` from the ingredient lists.
    pub fn recompute_match(&mut self) {
        self.match_percentage = match_percentage(&self.ingredients_required, &self.ingredients_missing);
    }
}

/// `(required - missing) / required * 100`, or 0 with nothing required.
pub fn match_percentage(required: &[String], missing: &[String]) -> f64 {
    if required.is_empty() {
        return 0.0;
    }
    let have = required.len().saturating_sub(missing.len()) as f64;
    (have / required.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// Post-generation filters. Every set field must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeFilters {
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// Upper bound in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub exclude_ingredients: Vec<String>,
}

impl RecipeFilters {
    /// Whether a recipe passes all active filters.
    pub fn accepts(&self, recipe: &Recipe) -> bool {
        if !self.dietary_restrictions.is_empty()
            && !self
                .dietary_restrictions
                .iter()
                .any(|d| recipe.dietary_info.contains(d))
        {
            return false;
        }
        if let Some(cuisine) = &self.cuisine
            && recipe.cuisine.as_ref() != Some(cuisine)
        {
            return false;
        }
        if let Some(max) = self.cooking_time
            && recipe.cooking_time > max
        {
            return false;
        }
        if let Some(difficulty) = &self.difficulty
            && &recipe.difficulty != difficulty
        {
            return false;
        }
        !self
            .exclude_ingredients
            .iter()
            .any(|ex| recipe.ingredients_required.contains(ex))
    }

    /// Keep accepted recipes, preserving order.
    pub fn apply(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.into_iter().filter(|r| self.accepts(r)).collect()
    }
}

fn default_max_results() -> usize {
    10
}

/// Ask for recipes that use the given ingredients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RecipeFilters>,
    /// 1–50.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl SuggestionRequest {
    pub fn new(ingredients: Vec<String>) -> Self {
        Self {
            ingredients,
            filters: None,
            max_results: default_max_results(),
        }
    }

    pub fn filters(mut self, filters: RecipeFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub recipes: Vec<Recipe>,
    pub total_results: usize,
}

fn default_servings() -> u32 {
    4
}

/// Ask for a full recipe by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetailsRequest {
    pub recipe_name: String,
    pub ingredients: Vec<String>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    /// Desired cooking time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<u32>,
}

impl RecipeDetailsRequest {
    pub fn new(recipe_name: impl Into<String>, ingredients: Vec<String>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            ingredients,
            servings: default_servings(),
            cooking_time: None,
        }
    }

    pub fn servings(mut self, servings: u32) -> Self {
        self.servings = servings;
        self
    }

    pub fn cooking_time(mut self, minutes: u32) -> Self {
        self.cooking_time = Some(minutes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeInstruction {
    /// 1-based.
    pub step: u32,
    pub description: String,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

/// Per-serving nutrition estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

/// A fully generated recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub recipe_id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<RecipeInstruction>,
    pub cooking_time: u32,
    pub prep_time: u32,
    pub total_time: u32,
    pub servings: u32,
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInfo>,
}
