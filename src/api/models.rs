//! Known models per provider kind, for configuration pickers

use super::ProviderKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    /// Rough cost tier shown to the user
    pub cost: &'static str,
    /// Runs without any network access to a third party
    pub offline: bool,
}

const fn model(id: &'static str, name: &'static str, cost: &'static str, offline: bool) -> ModelInfo {
    ModelInfo {
        id,
        name,
        cost,
        offline,
    }
}

const BASIC_MODELS: &[ModelInfo] = &[model("basic", "Basic mode (keywords)", "free", true)];

const OPENAI_MODELS: &[ModelInfo] = &[
    model("gpt-4o", "GPT-4 Omni (recommended)", "$$$", false),
    model("gpt-4-turbo", "GPT-4 Turbo", "$$$", false),
    model("gpt-4", "GPT-4", "$$$$", false),
    model("gpt-3.5-turbo", "GPT-3.5 Turbo", "$", false),
];

const ANTHROPIC_MODELS: &[ModelInfo] = &[
    model("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet (recommended)", "$$$", false),
    model("claude-3-opus-20240229", "Claude 3 Opus", "$$$$", false),
    model("claude-3-sonnet-20240229", "Claude 3 Sonnet", "$$", false),
    model("claude-3-haiku-20240307", "Claude 3 Haiku", "$", false),
];

const GOOGLE_MODELS: &[ModelInfo] = &[
    model("gemini-2.5-flash", "Gemini 2.5 Flash (recommended)", "free tier", false),
    model("gemini-2.5-pro", "Gemini 2.5 Pro", "free tier", false),
    model("gemini-2.0-flash", "Gemini 2.0 Flash", "free tier", false),
    model("gemini-flash-latest", "Gemini Flash (auto-update)", "free tier", false),
];

const LOCAL_MODELS: &[ModelInfo] = &[
    model("llama3.2:3b", "Llama 3.2 3B (recommended)", "free", true),
    model("llama3.2:1b", "Llama 3.2 1B (fast)", "free", true),
    model("mistral", "Mistral 7B", "free", true),
    model("gemma2:2b", "Gemma 2 2B", "free", true),
    model("meditron", "Meditron (medical)", "free", true),
];

pub fn available_models(kind: ProviderKind) -> &'static [ModelInfo] {
    match kind {
        ProviderKind::Offline => BASIC_MODELS,
        ProviderKind::OpenAi => OPENAI_MODELS,
        ProviderKind::Anthropic => ANTHROPIC_MODELS,
        ProviderKind::Google => GOOGLE_MODELS,
        ProviderKind::Local => LOCAL_MODELS,
    }
}
