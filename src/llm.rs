use crate::config::Config;
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Assistant bubble shown when the endpoint answers 429
pub const RATE_LIMIT_NOTICE: &str = "Limit exceeded, please try again later.";

/// Body of a `generateContent` call
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

impl GenerateRequest {
    /// A request carrying only `prompt`; no earlier turns are included
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateResponse {
    /// First fragment of the first candidate, trimmed. `None` if there is nothing to show.
    pub fn first_text(&self) -> Option<&str> {
        let text = self
            .candidates
            .first()?
            .content
            .parts
            .first()?
            .text
            .trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Status and body exactly as the endpoint returned them
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub body: String,
}

impl RawReply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Classify the reply into assistant text or a failure
    pub fn into_text(self) -> Result<String, ChatError> {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }
        if !self.status.is_success() {
            return Err(ChatError::RequestFailed {
                status: self.status.as_u16(),
                body: self.body,
            });
        }

        let response: GenerateResponse = serde_json::from_str(&self.body)?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or(ChatError::NoCandidates)
    }
}

/// A remote text-completion endpoint taking one prompt per call
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<RawReply, ChatError>;
}

/// HTTP client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let api_key = config
            .get_api_key()
            .ok_or_else(|| ChatError::MissingApiKey(config.api_key_env.clone()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CompletionEndpoint for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<RawReply, ChatError> {
        let url = self.endpoint_url();
        tracing::debug!(%url, chars = prompt.chars().count(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "completion response received");

        Ok(RawReply::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_carries_only_the_prompt() {
        let body = serde_json::to_value(GenerateRequest::from_prompt("What is Rust?")).unwrap();
        assert_eq!(
            body,
            json!({ "contents": [ { "parts": [ { "text": "What is Rust?" } ] } ] })
        );
    }

    #[test]
    fn success_reply_is_trimmed() {
        let reply = RawReply::new(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"  Hello there  "}]}}]}"#,
        );
        assert_eq!(reply.into_text().unwrap(), "Hello there");
    }

    #[test]
    fn only_first_candidate_and_part_are_used() {
        let reply = RawReply::new(
            StatusCode::OK,
            r#"{"candidates":[
                {"content":{"parts":[{"text":"first"},{"text":"second part"}]}},
                {"content":{"parts":[{"text":"other candidate"}]}}
            ],"usageMetadata":{"totalTokenCount":7}}"#,
        );
        assert_eq!(reply.into_text().unwrap(), "first");
    }

    #[test]
    fn rate_limit_is_classified_before_body() {
        let reply = RawReply::new(StatusCode::TOO_MANY_REQUESTS, "not json");
        assert!(matches!(reply.into_text(), Err(ChatError::RateLimited)));
    }

    #[test]
    fn other_error_status_keeps_body() {
        let reply = RawReply::new(StatusCode::FORBIDDEN, "{\"error\":\"bad key\"}");
        match reply.into_text() {
            Err(ChatError::RequestFailed { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_candidates_and_blank_text_yield_nothing() {
        let empty = RawReply::new(StatusCode::OK, r#"{"candidates":[]}"#);
        assert!(matches!(empty.into_text(), Err(ChatError::NoCandidates)));

        let no_parts = RawReply::new(StatusCode::OK, r#"{"candidates":[{"content":{"parts":[]}}]}"#);
        assert!(matches!(no_parts.into_text(), Err(ChatError::NoCandidates)));

        let blank = RawReply::new(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#,
        );
        assert!(matches!(blank.into_text(), Err(ChatError::NoCandidates)));

        let missing = RawReply::new(StatusCode::OK, "{}");
        assert!(matches!(missing.into_text(), Err(ChatError::NoCandidates)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let reply = RawReply::new(StatusCode::OK, "{\"candidates\": [");
        assert!(matches!(reply.into_text(), Err(ChatError::Parse(_))));
    }

    #[test]
    fn client_requires_an_api_key() {
        let config = Config {
            api_key: None,
            api_key_env: "CHATBOX_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            GeminiClient::new(&config),
            Err(ChatError::MissingApiKey(var)) if var == "CHATBOX_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn endpoint_url_joins_base_and_model() {
        let config = Config {
            api_key: Some("k".to_string()),
            base_url: "http://localhost:8080/v1beta/".to_string(),
            model: "gemini-test".to_string(),
            ..Config::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint_url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(client.model(), "gemini-test");
    }
}
