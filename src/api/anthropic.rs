//! Anthropic messages adapter (API key header + version header)

use super::client::{base_url, counter, HttpTransport};
use super::{
    split_system, ApiError, GatewayResponse, Message, ProviderAdapter, ProviderKind, Role,
    TokenUsage,
};
use crate::config::ProviderProfile;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

pub struct AnthropicAdapter {
    http: HttpTransport,
}

impl AnthropicAdapter {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    fn build_request(model: &str, messages: &[Message]) -> Value {
        let (system, turns) = split_system(messages);

        let messages: Vec<Value> = turns
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "assistant",
                    _ => "user",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        if let Some(system) = system {
            body["system"] = json!(system);
        }

        body
    }

    fn parse_response(response: &Value) -> GatewayResponse {
        let content: String = response["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"].as_str().unwrap_or("text") == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        let usage = &response["usage"];
        let usage = usage.is_object().then(|| {
            TokenUsage::new(
                counter(&usage["input_tokens"]),
                counter(&usage["output_tokens"]),
            )
        });

        GatewayResponse::success(content, usage)
    }

    async fn call(&self, profile: &ProviderProfile, messages: &[Message]) -> Result<GatewayResponse, ApiError> {
        let api_key = profile
            .credential()
            .ok_or(ApiError::MissingCredential(ProviderKind::Anthropic))?;

        let url = format!(
            "{}/v1/messages",
            base_url(profile.endpoint_override.as_deref(), DEFAULT_BASE_URL)
        );
        let body = Self::build_request(&profile.model_id, messages);

        debug!(model = %profile.model_id, messages = messages.len(), "Calling Anthropic API");

        let json = self
            .http
            .post_json(
                &url,
                &[
                    ("x-api-key", api_key.to_string()),
                    ("anthropic-version", API_VERSION.to_string()),
                ],
                &body,
                "Anthropic API error",
            )
            .await?;

        let response = Self::parse_response(&json);
        info!(tokens = ?response.usage, "Anthropic response received");
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn invoke(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        self.call(profile, messages).await.unwrap_or_else(|e| {
            warn!("Anthropic call failed: {}", e);
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

    #[test]
    fn test_system_prompt_is_separated() {
        let body = AnthropicAdapter::build_request(
            "claude-3-5-sonnet-20241022",
            &[
                Message::system("Tu es un assistant santé"),
                Message::user("Bonjour"),
                Message::assistant("Bonjour !"),
                Message::user("J'ai de la fièvre"),
            ],
        );

        assert_eq!(body["system"], "Tu es un assistant santé");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[test]
    fn test_text_blocks_are_joined() {
        let response = AnthropicAdapter::parse_response(&json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "world"}
            ],
            "usage": {"input_tokens": 7, "output_tokens": 2}
        }));

        assert_eq!(response.content.as_deref(), Some("Hello world"));
        assert_eq!(response.usage, Some(TokenUsage::new(7, 2)));
    }

    #[tokio::test]
    async fn test_request_carries_key_and_version_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({"system": "sys"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}],
                "usage": {"input_tokens": 4, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = ProviderProfile::new(ProviderKind::Anthropic, "claude-3-haiku-20240307")
            .with_credential("ak-test")
            .with_endpoint(server.uri());
        let adapter = AnthropicAdapter::new(HttpTransport::new(Duration::from_secs(5)).unwrap());

        let response = adapter
            .invoke(&profile, &[Message::system("sys"), Message::user("hi")])
            .await;

        assert!(response.success);
        assert_eq!(response.content.as_deref(), Some("ok"));
        assert_eq!(response.usage.unwrap().tokens_total, 5);
    }

    #[tokio::test]
    async fn test_overloaded_error_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let profile = ProviderProfile::new(ProviderKind::Anthropic, "claude-3-haiku-20240307")
            .with_credential("ak-test")
            .with_endpoint(server.uri());
        let adapter = AnthropicAdapter::new(HttpTransport::new(Duration::from_secs(5)).unwrap());

        let response = adapter.invoke(&profile, &[Message::user("hi")]).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Overloaded (HTTP 529)"));
    }
}
