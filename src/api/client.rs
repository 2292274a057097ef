//! Shared HTTP plumbing for the network-backed adapters

use super::ApiError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A reqwest client bounded by a per-call timeout
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// POST a JSON body once and return the decoded 2xx body.
    ///
    /// Non-2xx replies become `ApiError::Status` carrying the message from the
    /// backend's error envelope, or `fallback` when the envelope is unreadable.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
        fallback: &str,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);

        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if status.is_success() {
            let text = response.text().await.map_err(|e| self.classify(e))?;
            return serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        debug!("Backend returned {}: {}", status, text);

        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|json| envelope_message(&json))
            .unwrap_or_else(|| fallback.to_string());

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Http(err)
        }
    }
}

/// Extract a human readable message from a backend error body.
///
/// Cloud APIs nest it as `{"error": {"message": ...}}`; Ollama sends
/// `{"error": "..."}`.
pub(crate) fn envelope_message(json: &Value) -> Option<String> {
    let error = &json["error"];
    error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .or_else(|| json["message"].as_str())
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// Base URL for a backend, honouring a profile override
pub(crate) fn base_url<'a>(endpoint_override: Option<&'a str>, default: &'a str) -> &'a str {
    endpoint_override
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
}

/// Read a token counter that may be absent, saturating at `u32::MAX`
pub(crate) fn counter(value: &Value) -> u32 {
    value.as_u64().map(saturate).unwrap_or(0)
}

/// Read a counter only when the backend reports it
pub(crate) fn optional_counter(value: &Value) -> Option<u32> {
    value.as_u64().map(saturate)
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
