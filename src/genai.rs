//! Generative-text boundary: one prompt in, one untyped JSON payload out.
//!
//! The payload shape depends on the provider and SDK in front of it, so the
//! orchestrator never reads it directly; [`decode_response`] turns it into
//! plain text or reports that it could not.

use std::time::Instant;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AdviceServiceError;
use crate::settings::AdviceConfig;

pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<Value, AdviceServiceError>;
}

/// Client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: crate::settings::DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Build from configuration; `None` when no credential is configured.
    pub fn from_config(config: &AdviceConfig) -> Option<Self> {
        let key = config.api_key.as_deref()?;
        Some(Self::new(key, config.model.clone()).with_base_url(config.base_url.clone()))
    }

    /// Set a custom base URL (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<Value, AdviceServiceError> {
        let start = Instant::now();
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                warn!(error = %e, "advice request failed");
                AdviceServiceError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            warn!(status = %status, error = %error_text, "advice API error");
            return Err(AdviceServiceError::Api(format!("{status}: {error_text}")));
        }

        let payload: Value = response.json().map_err(|e| AdviceServiceError::Parse(e.to_string()))?;
        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "advice generation complete"
        );
        Ok(payload)
    }
}

/// Outcome of normalizing a generation payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// One of the known shapes matched.
    Text(String),
    /// No known shape matched; the payload serialized as-is.
    Stringified(String),
    /// Nothing usable: null or empty.
    Unrecognized,
}

impl Decoded {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(t) | Self::Stringified(t) => Some(t),
            Self::Unrecognized => None,
        }
    }
}

/// Wrapper keys generic SDK payloads put their result under.
const ENVELOPE_KEYS: &[&str] = &["result", "response", "data", "output"];

pub fn decode_response(payload: &Value) -> Decoded {
    if let Some(text) = plain_text(payload)
        .or_else(|| text_field(payload))
        .or_else(|| candidate_text(payload))
        .or_else(|| enveloped_text(payload))
    {
        return Decoded::Text(text);
    }
    match payload {
        Value::Null => Decoded::Unrecognized,
        Value::String(s) if s.trim().is_empty() => Decoded::Unrecognized,
        Value::Object(map) if map.is_empty() => Decoded::Unrecognized,
        Value::Array(items) if items.is_empty() => Decoded::Unrecognized,
        other => Decoded::Stringified(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.trim().is_empty()).then(|| s.to_string())
}

fn plain_text(payload: &Value) -> Option<String> {
    payload.as_str().and_then(non_empty)
}

fn text_field(payload: &Value) -> Option<String> {
    payload.get("text")?.as_str().and_then(non_empty)
}

// candidates[0].content.parts[0].text
fn candidate_text(payload: &Value) -> Option<String> {
    payload
        .pointer("/candidates/0/content/parts/0/text")?
        .as_str()
        .and_then(non_empty)
}

fn enveloped_text(payload: &Value) -> Option<String> {
    ENVELOPE_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|inner| text_field(inner).or_else(|| candidate_text(inner)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_string() {
        assert_eq!(decode_response(&json!("Save more.")), Decoded::Text("Save more.".into()));
    }

    #[test]
    fn test_direct_text_field() {
        assert_eq!(decode_response(&json!({"text": "hello"})), Decoded::Text("hello".into()));
    }

    #[test]
    fn test_candidate_path() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "from candidate" }], "role": "model" } }],
            "usageMetadata": { "totalTokenCount": 12 }
        });
        assert_eq!(decode_response(&payload), Decoded::Text("from candidate".into()));
    }

    #[test]
    fn test_enveloped_text_field() {
        let payload = json!({"result": {"text": "wrapped", "finish": "STOP"}});
        assert_eq!(decode_response(&payload), Decoded::Text("wrapped".into()));
    }

    #[test]
    fn test_unknown_shape_is_stringified() {
        let payload = json!({"choices": [{"message": "hi"}]});
        match decode_response(&payload) {
            Decoded::Stringified(s) => assert!(s.contains("choices")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_payloads_unrecognized() {
        assert_eq!(decode_response(&Value::Null), Decoded::Unrecognized);
        assert_eq!(decode_response(&json!({})), Decoded::Unrecognized);
        assert_eq!(decode_response(&json!([])), Decoded::Unrecognized);
        assert_eq!(decode_response(&json!("  ")), Decoded::Unrecognized);
    }

    #[test]
    fn test_empty_candidate_text_falls_through() {
        let payload = json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]});
        assert!(matches!(decode_response(&payload), Decoded::Stringified(_)));
    }

    #[test]
    fn test_client_builder() {
        let client = GeminiClient::new("k", "gemini-test").with_base_url("http://localhost:9/v1/");
        assert_eq!(client.base_url(), "http://localhost:9/v1");
        assert_eq!(client.model(), "gemini-test");
    }

    #[test]
    fn test_from_config_requires_key() {
        let mut config = AdviceConfig::default();
        config.api_key = None;
        assert!(GeminiClient::from_config(&config).is_none());
        config.api_key = Some("k".into());
        assert!(GeminiClient::from_config(&config).is_some());
    }

    #[test]
    fn test_unreachable_endpoint_is_network_error() {
        let client = GeminiClient::new("k", "m").with_base_url("http://127.0.0.1:9");
        let err = client.generate("ping").unwrap_err();
        assert!(matches!(err, AdviceServiceError::Network(_)));
    }
}
