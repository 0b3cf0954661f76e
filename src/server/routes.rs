//! Route table and handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use super::AppState;
use super::middleware::{ApiKey, rate_limit};
use crate::Result;
use crate::types::{
    PersonalizedSuggestionRequest, PersonalizedSuggestionResponse, RecipeDetails,
    RecipeDetailsRequest, RecognitionRequest, RecognitionResponse, SuggestionRequest,
    SuggestionResponse,
};

const SERVICE_NAME: &str = "souschef";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/ai", get(api_info))
        .route("/api/ai/health", get(health))
        .route("/api/ai/recognize-ingredients", post(recognize_ingredients))
        .route("/api/ai/suggest-recipes", post(suggest_recipes))
        .route("/api/ai/generate-recipe-details", post(generate_recipe_details))
        .route("/api/ai/personalize-suggestions", post(personalize_suggestions))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "status": "running",
    }))
}

async fn api_info() -> Json<Value> {
    let endpoint = |method: &str, path: &str, description: &str| {
        json!({ "method": method, "path": path, "description": description })
    };
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "endpoints": {
            "recognize_ingredients": endpoint(
                "POST",
                "/api/ai/recognize-ingredients",
                "Recognize ingredients from an image",
            ),
            "suggest_recipes": endpoint(
                "POST",
                "/api/ai/suggest-recipes",
                "Get recipe suggestions based on ingredients",
            ),
            "generate_recipe_details": endpoint(
                "POST",
                "/api/ai/generate-recipe-details",
                "Generate detailed recipe instructions",
            ),
            "personalize_suggestions": endpoint(
                "POST",
                "/api/ai/personalize-suggestions",
                "Get personalized recipe suggestions",
            ),
            "health": endpoint("GET", "/api/ai/health", "Service health check"),
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": VERSION,
        "generative_available": state.backend.is_available(),
        "provider": state.backend.name(),
        "cache_enabled": state.cache.is_enabled(),
    }))
}

async fn recognize_ingredients(
    State(state): State<AppState>,
    _key: ApiKey,
    payload: std::result::Result<Json<RecognitionRequest>, JsonRejection>,
) -> Result<Json<RecognitionResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.recognition.recognize(&request).await?))
}

async fn suggest_recipes(
    State(state): State<AppState>,
    _key: ApiKey,
    payload: std::result::Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<SuggestionResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.recipes.suggest_recipes(&request).await?))
}

async fn generate_recipe_details(
    State(state): State<AppState>,
    _key: ApiKey,
    payload: std::result::Result<Json<RecipeDetailsRequest>, JsonRejection>,
) -> Result<Json<RecipeDetails>> {
    let Json(request) = payload?;
    Ok(Json(state.recipes.generate_recipe_details(&request).await?))
}

async fn personalize_suggestions(
    State(state): State<AppState>,
    _key: ApiKey,
    payload: std::result::Result<Json<PersonalizedSuggestionRequest>, JsonRejection>,
) -> Result<Json<PersonalizedSuggestionResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.recipes.personalize_suggestions(&request).await?))
}
