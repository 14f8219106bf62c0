use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::ModerationConfig;

/// Remote profanity classifier. The rest of the system treats this as an
/// opaque call and never depends on it succeeding.
#[async_trait]
pub trait ProfanityClassifier: Send + Sync {
    async fn contains_profanity(&self, text: &str) -> Result<bool, String>;
}

pub struct HttpProfanityClassifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    flagged: bool,
}

impl HttpProfanityClassifier {
    pub fn new(config: &ModerationConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build reqwest client"),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl ProfanityClassifier for HttpProfanityClassifier {
    async fn contains_profanity(&self, text: &str) -> Result<bool, String> {
        let mut req = self.client.post(&self.url).json(&json!({ "text": text }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| format!("Moderation request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("Moderation API returned {}", resp.status()));
        }

        let body: ClassifyResponse = resp
            .json()
            .await
            .map_err(|e| format!("Invalid moderation response: {e}"))?;

        Ok(body.flagged)
    }
}

/// Screen text, failing open: a missing or broken classifier never blocks
/// content, it only loses the screening.
pub async fn screen(classifier: &Option<Arc<dyn ProfanityClassifier>>, text: &str) -> bool {
    let Some(classifier) = classifier else {
        return false;
    };

    match classifier.contains_profanity(text).await {
        Ok(flagged) => flagged,
        Err(e) => {
            tracing::warn!("Profanity check failed, treating as clean: {e}");
            false
        }
    }
}
