//! OpenAI chat completions adapter (bearer token)

use super::client::{base_url, counter, optional_counter, HttpTransport};
use super::{ApiError, GatewayResponse, Message, ProviderAdapter, ProviderKind, TokenUsage};
use crate::config::ProviderProfile;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

/// Reasoning model families reject `max_tokens` and a custom temperature
fn is_reasoning_model(model: &str) -> bool {
    let model = model.to_lowercase();
    ["o1", "o3", "o4", "gpt-5"]
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

pub struct OpenAiAdapter {
    http: HttpTransport,
}

impl OpenAiAdapter {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    fn build_request(model: &str, messages: &[Message]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
        });

        if is_reasoning_model(model) {
            body["max_completion_tokens"] = json!(MAX_TOKENS);
        } else {
            body["max_tokens"] = json!(MAX_TOKENS);
            body["temperature"] = json!(TEMPERATURE);
        }

        body
    }

    fn parse_response(response: &Value) -> GatewayResponse {
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("");

        let usage = &response["usage"];
        let usage = usage.is_object().then(|| {
            TokenUsage::with_total(
                counter(&usage["prompt_tokens"]),
                counter(&usage["completion_tokens"]),
                optional_counter(&usage["total_tokens"]),
            )
        });

        GatewayResponse::success(content, usage)
    }

    async fn call(&self, profile: &ProviderProfile, messages: &[Message]) -> Result<GatewayResponse, ApiError> {
        let api_key = profile
            .credential()
            .ok_or(ApiError::MissingCredential(ProviderKind::OpenAi))?;

        let url = format!(
            "{}/v1/chat/completions",
            base_url(profile.endpoint_override.as_deref(), DEFAULT_BASE_URL)
        );
        let body = Self::build_request(&profile.model_id, messages);

        debug!(model = %profile.model_id, messages = messages.len(), "Calling OpenAI API");

        let json = self
            .http
            .post_json(
                &url,
                &[("Authorization", format!("Bearer {}", api_key))],
                &body,
                "OpenAI API error",
            )
            .await?;

        let response = Self::parse_response(&json);
        info!(tokens = ?response.usage, "OpenAI response received");
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    async fn invoke(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        self.call(profile, messages).await.unwrap_or_else(|e| {
            warn!("OpenAI call failed: {}", e);
            GatewayResponse::failure(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile(server: &MockServer, model: &str) -> ProviderProfile {
        ProviderProfile::new(ProviderKind::OpenAi, model)
            .with_credential("sk-test")
            .with_endpoint(server.uri())
    }

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(HttpTransport::new(Duration::from_secs(5)).unwrap())
    }

    #[test]
    fn test_reasoning_models_use_completion_token_field() {
        let body = OpenAiAdapter::build_request("o3-mini", &[Message::user("hi")]);
        assert_eq!(body["max_completion_tokens"], 2000);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());

        let body = OpenAiAdapter::build_request("gpt-4o", &[Message::user("hi")]);
        assert_eq!(body["max_tokens"], 2000);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[tokio::test]
    async fn test_success_normalizes_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Bonjour"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter()
            .invoke(&profile(&server, "gpt-4o"), &[Message::user("Salut")])
            .await;

        assert!(response.success);
        assert_eq!(response.content.as_deref(), Some("Bonjour"));
        assert_eq!(response.usage, Some(TokenUsage::new(12, 3)));
    }

    #[tokio::test]
    async fn test_empty_content_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let response = adapter()
            .invoke(&profile(&server, "gpt-4o"), &[Message::user("x")])
            .await;

        assert!(response.success);
        assert_eq!(response.content.as_deref(), Some(""));
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_error_envelope_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let response = adapter()
            .invoke(&profile(&server, "gpt-4o"), &[Message::user("x")])
            .await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let profile = ProviderProfile::new(ProviderKind::OpenAi, "gpt-4o").with_endpoint(server.uri());
        let response = adapter().invoke(&profile, &[Message::user("x")]).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("OpenAI API key is missing"));
    }
}
