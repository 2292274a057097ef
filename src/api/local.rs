//! Local inference adapter using Ollama's chat endpoint

use super::client::{base_url, counter, HttpTransport};
use super::{ApiError, GatewayResponse, Message, ProviderAdapter, TokenUsage};
use crate::config::ProviderProfile;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Ollama's default listen address
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

pub struct LocalAdapter {
    http: HttpTransport,
}

impl LocalAdapter {
    pub fn new(http: HttpTransport) -> Self {
        Self { http }
    }

    fn build_request(model: &str, messages: &[Message]) -> Value {
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model
        };

        json!({
            "model": model,
            "messages": messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
                .collect::<Vec<_>>(),
            "stream": false,
        })
    }

    fn parse_response(response: &Value) -> GatewayResponse {
        let content = response["message"]["content"].as_str().unwrap_or("");

        // Ollama reports evaluation counts rather than token usage
        let usage = (response.get("prompt_eval_count").is_some()
            || response.get("eval_count").is_some())
        .then(|| {
            TokenUsage::new(
                counter(&response["prompt_eval_count"]),
                counter(&response["eval_count"]),
            )
        });

        GatewayResponse::success(content, usage)
    }

    async fn call(&self, profile: &ProviderProfile, messages: &[Message]) -> Result<GatewayResponse, ApiError> {
        let endpoint = base_url(profile.endpoint_override.as_deref(), DEFAULT_LOCAL_ENDPOINT);
        let url = format!("{}/api/chat", endpoint);
        let body = Self::build_request(&profile.model_id, messages);

        debug!(endpoint, model = %profile.model_id, "Calling local inference server");

        let json = self
            .http
            .post_json(
                &url,
                &[],
                &body,
                "local server error, check that Ollama is running",
            )
            .await?;

        let response = Self::parse_response(&json);
        info!(tokens = ?response.usage, "Local response received");
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for LocalAdapter {
    async fn invoke(&self, profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        self.call(profile, messages).await.unwrap_or_else(|e| {
            warn!("Local call failed: {}", e);
            let message = match e {
                ApiError::Http(err) => format!("cannot reach the local server: {}", err),
                other => other.to_string(),
            };
            GatewayResponse::failure(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProviderKind;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter() -> LocalAdapter {
        LocalAdapter::new(HttpTransport::new(Duration::from_secs(5)).unwrap())
    }

    #[test]
    fn test_empty_model_uses_default() {
        let body = LocalAdapter::build_request("", &[Message::user("hi")]);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_chat_with_override_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "meditron", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "meditron",
                "message": {"role": "assistant", "content": "Reposez-vous."},
                "done": true,
                "prompt_eval_count": 26,
                "eval_count": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = ProviderProfile::new(ProviderKind::Local, "meditron").with_endpoint(server.uri());
        let response = adapter().invoke(&profile, &[Message::user("fatigue")]).await;

        assert!(response.success);
        assert_eq!(response.content.as_deref(), Some("Reposez-vous."));
        assert_eq!(response.usage, Some(TokenUsage::new(26, 5)));
    }

    #[tokio::test]
    async fn test_missing_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "model 'x' not found"})),
            )
            .mount(&server)
            .await;

        let profile = ProviderProfile::new(ProviderKind::Local, "x").with_endpoint(server.uri());
        let response = adapter().invoke(&profile, &[Message::user("hi")]).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("model 'x' not found (HTTP 404)"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Nothing listens on the discard port
        let profile = ProviderProfile::new(ProviderKind::Local, "llama3.2").with_endpoint("http://127.0.0.1:9");
        let response = adapter().invoke(&profile, &[Message::user("hi")]).await;

        assert!(!response.success);
        assert!(response.error.unwrap().starts_with("cannot reach the local server"));
    }
}
