//! Catalog of selectable gateway models.

use once_cell::sync::Lazy;
use serde::Serialize;

/// A selectable model offered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Gateway model identifier, e.g. `openai/gpt-4o`.
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Provider display name.
    pub provider: &'static str,
}

/// Models offered to the front ends, in display order.
pub static MODELS: Lazy<Vec<ModelInfo>> = Lazy::new(|| {
    vec![
        ModelInfo {
            id: "google/gemini-2.5-flash",
            name: "Gemini 2.5 Flash",
            provider: "Google",
        },
        ModelInfo {
            id: "openai/gpt-4o-mini",
            name: "GPT-4o Mini",
            provider: "OpenAI",
        },
        ModelInfo {
            id: "meta-llama/llama-3.1-70b-instruct",
            name: "Llama 3.1 70B",
            provider: "Meta",
        },
        ModelInfo {
            id: "openai/gpt-4o",
            name: "GPT-4o",
            provider: "OpenAI",
        },
        ModelInfo {
            id: "anthropic/claude-sonnet-4",
            name: "Claude Sonnet 4",
            provider: "Anthropic",
        },
    ]
});

/// Returns the default model for new conversations.
pub fn default_model() -> &'static str {
    MODELS[0].id
}

/// Returns the display name for a model id, falling back to the raw id.
pub fn model_name(model_id: &str) -> &str {
    MODELS
        .iter()
        .find(|m| m.id == model_id)
        .map(|m| m.name)
        .unwrap_or(model_id)
}
