//! Souschef - generative-AI pipeline for recipes and ingredients
//!
//! This crate recognizes ingredients in photos and suggests recipes from
//! ingredient lists by prompting a generative model (Gemini or a local
//! Ollama server), then coercing the model's loosely structured output
//! into typed records. Results are cached, backend calls are retried with
//! exponential backoff, and the optional HTTP surface is rate limited per
//! client.
//!
//! # Suggestion Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use souschef::cache::{CacheStore, MemoryCache};
//! use souschef::providers::{GeminiBackend, RetryConfig, RetryingBackend};
//! use souschef::services::RecipeService;
//! use souschef::types::SuggestionRequest;
//!
//! #[tokio::main]
//! async fn main() -> souschef::Result<()> {
//!     let gemini = GeminiBackend::new(Some("your-api-key".into()), "gemini-2.0-flash");
//!     let backend = Arc::new(RetryingBackend::new(Arc::new(gemini), RetryConfig::default()));
//!     let cache = CacheStore::new(Arc::new(MemoryCache::new(1_000)));
//!
//!     let recipes = RecipeService::new(backend, cache);
//!     let response = recipes
//!         .suggest_recipes(&SuggestionRequest::new(vec!["tomato".into(), "pasta".into()]))
//!         .await?;
//!
//!     for recipe in response.recipes {
//!         println!("{} ({:.0}% match)", recipe.name, recipe.match_percentage);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # HTTP service (requires `server` feature)
//!
//! The `souschefd` binary serves the same operations under `/api/ai`; see
//! [`server`] for the router and configuration.

pub mod cache;
pub mod error;
pub mod extract;
pub mod image;
pub mod limiter;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{ErrorKind, Result, SouschefError};
pub use providers::GenerativeBackend;
pub use services::{RecipeService, RecognitionService};
