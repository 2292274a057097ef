//! Google Gemini generateContent adapter (API key in the query string)

use super::client::{base_url, counter, optional_counter, HttpTransport};
use super::{
    split_system, ApiError, GatewayResponse, Message, ProviderAdapter, ProviderKind, Role,
    TokenUsage,
};
use crate::config::ProviderProfile;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MAX_OUTPUT_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

/// API surface a Gemini model is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiVersion {
    V1,
    V1Beta,
}

impl ApiVersion {
    /// Gemini 1.5 and later, plus the flash/pro/exp aliases, only exist on v1beta
    fn for_model(model: &str) -> Self {
        const BETA_MARKERS: [&str; 7] = ["1.5", "2.0", "2.5", "3.0", "-flash", "-pro", "-exp"];
        if BETA_MARKERS.iter().any(|marker| model.contains(marker)) {
            ApiVersion::V1Beta
        } else {
            ApiVersion::V1
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V1Beta => "v1beta",
        }
    }
}

pub struct GoogleAdapter {
    http: HttpTransport,
}

impl GoogleAdapter {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    fn build_request(version: ApiVersion, messages: &[Message]) -> Value {
        let (system, turns) = split_system(messages);

        let mut contents: Vec<Value> = turns
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = json!({
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        });

        match (system, version) {
            (Some(system), ApiVersion::V1Beta) => {
                body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
            }
            // v1 has no systemInstruction field: fold it into the first user turn
            (Some(system), ApiVersion::V1) => {
                match contents.iter_mut().find(|c| c["role"] == "user") {
                    Some(first_user) => {
                        let merged = format!(
                            "{}\n\n{}",
                            system,
                            first_user["parts"][0]["text"].as_str().unwrap_or("")
                        );
                        first_user["parts"][0]["text"] = json!(merged);
                    }
                    None => contents.insert(0, json!({ "role": "user", "parts": [{ "text": system }] })),
                }
            }
            (None, _) => {}
        }

        body["contents"] = json!(contents);
        body
    }

    fn parse_response(response: &Value) -> GatewayResponse {
        let content: String = response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        let usage = &response["usageMetadata"];
        let usage = usage.is_object().then(|| {
            TokenUsage::with_total(
                counter(&usage["promptTokenCount"]),
                counter(&usage["candidatesTokenCount"]),
                optional_counter(&usage["totalTokenCount"]),
            )
        });

        GatewayResponse::success(content, usage)
    }

    async fn call(&self, profile: &ProviderProfile, messages: &[Message]) -> Result<GatewayResponse, ApiError> {
        let api_key = profile
            .credential()
            .ok_or(ApiError::MissingCredential(ProviderKind::Google))?;

        let version = ApiVersion::for_model(&profile.model_id);
        let url = format!(
            "{}/{}/models/{}:generateContent?key={}",
            base_url(profile.endpoint_override.as_deref(), DEFAULT_BASE_URL),
            version.as_str(),
            profile.model_id,
            api_key
        );
        let body = Self::build_request(version, messages);

        debug!(
            model = %profile.model_id,
            version = version.as_str(),
            messages = messages.len(),
            "Calling Google Gemini API"
        );

        let json = self
            .http
            .post_json(&url, &[], &body, "Google API error")
            .await?;

        let response = Self::parse_response(&json);
        info!(tokens = ?response.usage, "Google response received");
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    async fn invoke(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        self.call(profile, messages).await.unwrap_or_else(|e| {
            // reqwest errors can embed the URL, which carries the key
            let message = match e {
                ApiError::Http(err) => ApiError::Http(err.without_url()).to_string(),
                other => other.to_string(),
            };
            warn!("Google call failed: {}", message);
            GatewayResponse::failure(message)
        })
    }
}
