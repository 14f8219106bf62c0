use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::ReplyApiConfig;

/// Outcome classification drives the retry policy: transient failures are
/// retried with backoff, permanent ones terminate the job.
#[derive(Debug)]
pub enum GenerateError {
    Transient(String),
    Permanent(String),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Transient(msg) => write!(f, "transient: {msg}"),
            GenerateError::Permanent(msg) => write!(f, "permanent: {msg}"),
        }
    }
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        post_content: &str,
        comment_content: &str,
    ) -> Result<String, GenerateError>;
}

/// Client for a Gemini-style generateContent endpoint.
pub struct HttpReplyGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

impl HttpReplyGenerator {
    pub fn new(config: &ReplyApiConfig, timeout: std::time::Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build reqwest client"),
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate(
        &self,
        post_content: &str,
        comment_content: &str,
    ) -> Result<String, GenerateError> {
        let prompt = format!(
            "Post: '{post_content}'\nComment: '{comment_content}'\nReply with a thoughtful response:"
        );

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.url, self.model, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| GenerateError::Transient(format!("Reply request failed: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(GenerateError::Transient(format!(
                "Reply API returned {status}"
            )));
        }
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(256)
                .collect::<String>();
            return Err(GenerateError::Permanent(format!(
                "Reply API returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerateError::Transient(format!("Invalid reply response: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);

        match text {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(GenerateError::Permanent(
                "Reply API returned no candidates".to_string(),
            )),
        }
    }
}

/// Stand-in used when no reply API is configured. Jobs fail permanently
/// and stay visible in the failed list instead of retrying forever.
pub struct UnconfiguredReplyGenerator;

#[async_trait]
impl ReplyGenerator for UnconfiguredReplyGenerator {
    async fn generate(&self, _post: &str, _comment: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Permanent(
            "reply generation is not configured".to_string(),
        ))
    }
}
