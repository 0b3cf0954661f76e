//! Prompt construction.

use crate::types::{PersonalizedSuggestionRequest, RecipeDetailsRequest, SuggestionRequest};

/// History entries included in a personalized prompt.
pub const HISTORY_IN_PROMPT: usize = 5;

pub const RECOGNITION: &str = r#"Identify all ingredients visible in this image.
Return a JSON array of ingredients with the following structure:
[
    {
        "name": "ingredient_name",
        "confidence": 0.0-1.0,
        "quantity": "detected_quantity_or_null",
        "unit": "unit_of_measurement_or_null"
    }
]
Only include ingredients you can clearly identify. Be specific with ingredient names."#;

const RECIPE_FIELDS: &str = "For each recipe, provide:
- name: Recipe name
- description: Brief description
- ingredients_required: List of all required ingredients
- ingredients_missing: Ingredients not in the provided list
- match_percentage: Percentage of required ingredients that are available (0-100)
- cooking_time: Cooking time in minutes
- difficulty: beginner, intermediate, or advanced
- cuisine: Cuisine type
- dietary_info: List of dietary tags (vegetarian, vegan, gluten-free, etc.)
";

const RECIPE_LIST_SHAPE: &str = r#"
Return the response as a JSON array of recipes:
[
    {
        "id": "recipe_1",
        "name": "Recipe Name",
        "description": "Recipe description",
        "ingredients_required": ["ingredient1", "ingredient2"],
        "ingredients_missing": [],
        "match_percentage": 100,
        "cooking_time": 30,
        "difficulty": "beginner",
        "cuisine": "italian",
        "dietary_info": ["vegetarian"]
    }
]
"#;

const RECIPE_DETAILS_SHAPE: &str = r#"
Provide a complete recipe with:
- description: Detailed recipe description
- ingredients: List with quantities and units
- instructions: Step-by-step cooking instructions with step numbers
- prep_time: Preparation time in minutes
- cooking_time: Cooking time in minutes
- total_time: Total time (prep + cooking)
- difficulty: beginner, intermediate, or advanced
- nutrition: Estimated nutritional information (calories, protein, carbs, fat)

Return as JSON:
{
    "description": "...",
    "ingredients": [
        {"name": "ingredient", "quantity": "amount", "unit": "unit"}
    ],
    "instructions": [
        {"step": 1, "description": "...", "duration": 5}
    ],
    "prep_time": 10,
    "cooking_time": 25,
    "total_time": 35,
    "difficulty": "beginner",
    "nutrition": {"calories": 350, "protein": 12, "carbs": 65, "fat": 8}
}
"#;

pub fn suggestion(request: &SuggestionRequest) -> String {
    let mut prompt = format!(
        "Generate {} recipe suggestions using these ingredients: {}\n\n{RECIPE_FIELDS}\n",
        request.max_results,
        request.ingredients.join(", ")
    );

    if let Some(filters) = &request.filters {
        if !filters.dietary_restrictions.is_empty() {
            prompt.push_str(&format!(
                "Dietary restrictions: {}\n",
                filters.dietary_restrictions.join(", ")
            ));
        }
        if let Some(cuisine) = &filters.cuisine {
            prompt.push_str(&format!("Cuisine preference: {cuisine}\n"));
        }
        if let Some(minutes) = filters.cooking_time {
            prompt.push_str(&format!("Maximum cooking time: {minutes} minutes\n"));
        }
        if let Some(difficulty) = &filters.difficulty {
            prompt.push_str(&format!("Difficulty level: {difficulty}\n"));
        }
        if let Some(meal_type) = &filters.meal_type {
            prompt.push_str(&format!("Meal type: {meal_type}\n"));
        }
        if !filters.exclude_ingredients.is_empty() {
            prompt.push_str(&format!(
                "Do not use: {}\n",
                filters.exclude_ingredients.join(", ")
            ));
        }
    }

    prompt.push_str(RECIPE_LIST_SHAPE);
    prompt
}

pub fn recipe_details(request: &RecipeDetailsRequest) -> String {
    let mut prompt = format!(
        "Generate a detailed recipe for: {}\n\nAvailable ingredients: {}\nServings: {}\n",
        request.recipe_name,
        request.ingredients.join(", "),
        request.servings
    );
    if let Some(minutes) = request.cooking_time {
        prompt.push_str(&format!("Target cooking time: {minutes} minutes\n"));
    }
    prompt.push_str(RECIPE_DETAILS_SHAPE);
    prompt
}

pub fn personalized(request: &PersonalizedSuggestionRequest) -> String {
    let mut prompt = format!(
        "Generate {} personalized recipe suggestions using these ingredients: {}\n\nUser Context:\n",
        request.max_results,
        request.ingredients.join(", ")
    );

    if !request.cooking_history.is_empty() {
        prompt.push_str("Cooking History:\n");
        for entry in request.cooking_history.iter().take(HISTORY_IN_PROMPT) {
            prompt.push_str(&format!(
                "- Recipe {}: Rating {}/5\n",
                entry.recipe_id, entry.rating
            ));
        }
    }

    if let Some(prefs) = &request.preferences {
        if !prefs.dietary_restrictions.is_empty() {
            prompt.push_str(&format!(
                "Dietary restrictions: {}\n",
                prefs.dietary_restrictions.join(", ")
            ));
        }
        if !prefs.cuisine_preferences.is_empty() {
            prompt.push_str(&format!(
                "Preferred cuisines: {}\n",
                prefs.cuisine_preferences.join(", ")
            ));
        }
        if let Some(spice) = &prefs.spice_level {
            prompt.push_str(&format!("Spice level preference: {spice}\n"));
        }
    }

    prompt.push_str(
        "\nGenerate recipes that match the user's preferences and cooking history.\n\
         Prioritize recipes similar to highly-rated dishes in their history.\n\n",
    );
    prompt.push_str(RECIPE_FIELDS);
    prompt.push_str(RECIPE_LIST_SHAPE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CookingHistoryEntry, RecipeFilters, UserPreferences};

    #[test]
    fn suggestion_prompt_embeds_filters() {
        let request = SuggestionRequest::new(vec!["tomato".into(), "basil".into()])
            .max_results(5)
            .filters(RecipeFilters {
                cuisine: Some("italian".into()),
                cooking_time: Some(20),
                meal_type: Some("dinner".into()),
                ..Default::default()
            });
        let prompt = suggestion(&request);
        assert!(prompt.starts_with("Generate 5 recipe suggestions using these ingredients: tomato, basil"));
        assert!(prompt.contains("Cuisine preference: italian"));
        assert!(prompt.contains("Maximum cooking time: 20 minutes"));
        assert!(prompt.contains("Meal type: dinner"));
        assert!(!prompt.contains("Dietary restrictions"));
    }

    #[test]
    fn personalized_prompt_limits_history() {
        let history = (0..8)
            .map(|i| CookingHistoryEntry {
                recipe_id: format!("r{i}"),
                rating: 4,
                cooked_at: "2024-01-15".into(),
            })
            .collect();
        let request = PersonalizedSuggestionRequest {
            ingredients: vec!["rice".into()],
            user_id: "u1".into(),
            cooking_history: history,
            preferences: Some(UserPreferences {
                spice_level: Some("medium".into()),
                ..Default::default()
            }),
            max_results: 3,
        };
        let prompt = personalized(&request);
        assert!(prompt.contains("- Recipe r4: Rating 4/5"));
        assert!(!prompt.contains("- Recipe r5:"));
        assert!(prompt.contains("Spice level preference: medium"));
    }

    #[test]
    fn details_prompt_mentions_target_time() {
        let request = RecipeDetailsRequest::new("Risotto", vec!["rice".into()]).cooking_time(35);
        let prompt = recipe_details(&request);
        assert!(prompt.contains("Generate a detailed recipe for: Risotto"));
        assert!(prompt.contains("Target cooking time: 35 minutes"));
        assert!(prompt.contains("Servings: 4"));
    }
}
