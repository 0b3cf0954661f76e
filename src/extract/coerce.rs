//! Loosely typed records to domain types.
//!
//! Every field has a default, so a sparse or oddly typed record still
//! produces a value. Numbers may arrive as strings and lists as
//! comma-separated text.

use serde_json::Value;

use crate::cache::key::hash_hex;
use crate::types::{
    Ingredient, NutritionInfo, Recipe, RecipeDetails, RecipeDetailsRequest, RecipeIngredient,
    RecipeInstruction, Record,
};

const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_COOKING_TIME: u32 = 30;
const DEFAULT_PREP_TIME: u32 = 10;
const DEFAULT_DIFFICULTY: &str = "beginner";
/// Upper bound on any duration read from a record: one week.
const MAX_MINUTES: u32 = 7 * 24 * 60;

fn text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(number).filter(|v| v.is_finite())
}

fn whole(record: &Record, field: &str, max: u32) -> Option<u32> {
    float(record, field).map(|v| v.clamp(0.0, f64::from(max)).round() as u32)
}

fn minutes(record: &Record, field: &str) -> Option<u32> {
    whole(record, field, MAX_MINUTES)
}

fn list(record: &Record, field: &str) -> Vec<String> {
    match record.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

impl Ingredient {
    /// Build from an extracted record. Records without a name are dropped.
    pub fn from_record(record: &Record) -> Option<Self> {
        let name = text(record, "name")?;
        let mut ingredient = Ingredient::new(
            name,
            float(record, "confidence").unwrap_or(DEFAULT_CONFIDENCE),
        );
        ingredient.quantity = text(record, "quantity");
        ingredient.unit = text(record, "unit");
        Some(ingredient)
    }
}

impl Recipe {
    /// Build from an extracted record; `index` names recipes without an id.
    ///
    /// `match_percentage` is always recomputed from the ingredient lists.
    pub fn from_record(record: &Record, index: usize) -> Self {
        let mut recipe = Recipe {
            id: text(record, "id").unwrap_or_else(|| format!("recipe_{index}")),
            name: text(record, "name").unwrap_or_else(|| "Unknown Recipe".to_string()),
            description: text(record, "description").unwrap_or_default(),
            ingredients_required: list(record, "ingredients_required"),
            ingredients_missing: list(record, "ingredients_missing"),
            match_percentage: 0.0,
            cooking_time: minutes(record, "cooking_time").unwrap_or(DEFAULT_COOKING_TIME),
            difficulty: text(record, "difficulty")
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            cuisine: text(record, "cuisine"),
            dietary_info: list(record, "dietary_info"),
            image_url: text(record, "image_url"),
        };
        recipe.recompute_match();
        recipe
    }
}

impl RecipeDetails {
    /// Build from an extracted record and the request that produced it.
    ///
    /// Name and servings come from the request. Total time defaults to
    /// prep plus cooking time.
    pub fn from_record(record: &Record, request: &RecipeDetailsRequest) -> Self {
        let ingredients = match record.get("ingredients") {
            Some(Value::Array(items)) => items.iter().filter_map(recipe_ingredient).collect(),
            _ => Vec::new(),
        };

        let instructions = match record.get("instructions") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| instruction(item, i))
                .collect(),
            _ => Vec::new(),
        };

        let prep_time = minutes(record, "prep_time").unwrap_or(DEFAULT_PREP_TIME);
        let cooking_time = minutes(record, "cooking_time")
            .or(request.cooking_time)
            .unwrap_or(DEFAULT_COOKING_TIME);
        let total_time =
            minutes(record, "total_time").unwrap_or(prep_time.saturating_add(cooking_time));

        RecipeDetails {
            recipe_id: recipe_id(&request.recipe_name),
            name: request.recipe_name.clone(),
            description: text(record, "description").unwrap_or_default(),
            ingredients,
            instructions,
            cooking_time,
            prep_time,
            total_time,
            servings: request.servings.max(1),
            difficulty: text(record, "difficulty")
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            nutrition: match record.get("nutrition") {
                Some(Value::Object(n)) if !n.is_empty() => Some(nutrition(n)),
                _ => None,
            },
        }
    }
}

/// Stable id derived from the recipe name.
pub(crate) fn recipe_id(name: &str) -> String {
    format!("recipe_{}", hash_hex(name.trim().to_lowercase().as_bytes(), 8))
}

fn recipe_ingredient(item: &Value) -> Option<RecipeIngredient> {
    match item {
        Value::Object(obj) => Some(RecipeIngredient {
            name: text(obj, "name")?,
            quantity: text(obj, "quantity").unwrap_or_default(),
            unit: text(obj, "unit").unwrap_or_default(),
        }),
        Value::String(s) if !s.trim().is_empty() => Some(RecipeIngredient {
            name: s.trim().to_string(),
            quantity: String::new(),
            unit: String::new(),
        }),
        _ => None,
    }
}

fn instruction(item: &Value, index: usize) -> Option<RecipeInstruction> {
    let position = index as u32 + 1;
    match item {
        Value::Object(obj) => Some(RecipeInstruction {
            step: float(obj, "step")
                .filter(|s| *s >= 1.0)
                .map(|s| s as u32)
                .unwrap_or(position),
            description: text(obj, "description")?,
            duration: minutes(obj, "duration"),
        }),
        Value::String(s) if !s.trim().is_empty() => Some(RecipeInstruction {
            step: position,
            description: s.trim().to_string(),
            duration: None,
        }),
        _ => None,
    }
}

fn nutrition(record: &Record) -> NutritionInfo {
    let grams = |field: &str| float(record, field).map(|v| v.max(0.0));
    NutritionInfo {
        calories: whole(record, "calories", u32::MAX),
        protein: grams("protein"),
        carbs: grams("carbs"),
        fat: grams("fat"),
    }
}
