//! Orchestrators tying cache, generative backend and extraction together.

pub mod prompts;
pub mod recipes;
pub mod recognition;

pub use recipes::RecipeService;
pub use recognition::RecognitionService;

use std::time::Duration;

/// Seconds rounded to two decimals.
pub(crate) fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
