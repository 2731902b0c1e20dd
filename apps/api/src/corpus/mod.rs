//! Corpus client. The single point of entry for calls to the public
//! sentence corpus (Mozilla Common Voice sentence API).
//!
//! Handlers never hold a `CorpusClient` directly: `AppState` carries an
//! `Arc<dyn SentenceCorpus>` so the batching loop in `statements` can run
//! against any source.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod statements;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mozilla API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

impl CorpusError {
    /// Message shown to admins, without the upstream's own error prefix.
    pub fn user_message(&self) -> String {
        match self {
            CorpusError::Api { status, message } if message.trim().is_empty() => {
                format!("status {status}")
            }
            CorpusError::Api { message, .. } => statements::clean_error_message(message),
            other => other.to_string(),
        }
    }
}

/// One sentence as served by the corpus API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSentence {
    /// The API has served both numeric and string ids.
    pub id: Value,
    pub text: String,
    #[serde(default, alias = "languageCode", alias = "locale")]
    pub language_code: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub version: Option<i32>,
    #[serde(default, alias = "clipsCount")]
    pub clips_count: Option<i32>,
    #[serde(default, alias = "hasValidClip")]
    pub has_valid_clip: Option<bool>,
    #[serde(default, alias = "isValidated")]
    pub is_validated: Option<bool>,
    #[serde(default)]
    pub taxonomy: Option<Value>,
}

impl CorpusSentence {
    pub fn mozilla_id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentencesPayload {
    Bare(Vec<CorpusSentence>),
    Wrapped { sentences: Vec<CorpusSentence> },
}

impl SentencesPayload {
    fn into_sentences(self) -> Vec<CorpusSentence> {
        match self {
            SentencesPayload::Bare(s) => s,
            SentencesPayload::Wrapped { sentences } => sentences,
        }
    }
}

/// Parameters of one paginated batch request.
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    pub language_code: &'a str,
    pub licence: &'a str,
    pub limit: usize,
    pub offset: usize,
}

#[async_trait]
pub trait SentenceCorpus: Send + Sync {
    async fn fetch_batch(&self, request: BatchRequest<'_>)
        -> Result<Vec<CorpusSentence>, CorpusError>;
}

/// HTTP implementation over reqwest with retry on 429 and 5xx.
#[derive(Clone)]
pub struct CorpusClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl CorpusClient {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }
}

#[async_trait]
impl SentenceCorpus for CorpusClient {
    async fn fetch_batch(
        &self,
        request: BatchRequest<'_>,
    ) -> Result<Vec<CorpusSentence>, CorpusError> {
        let url = format!("{}/sentences", self.base_url);
        let limit = request.limit.to_string();
        let offset = request.offset.to_string();
        let query = [
            ("languageCode", request.language_code),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
            ("taxonomy[Licence]", request.licence),
        ];

        let mut last_error: Option<CorpusError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Corpus request attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.get(&url).query(&query);
            if let Some(token) = &self.api_token {
                builder = builder.bearer_auth(token);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(CorpusError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Corpus API returned {}: {}", status, body);
                last_error = Some(CorpusError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CorpusError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let body = response.text().await?;
            let sentences = serde_json::from_str::<SentencesPayload>(&body)?.into_sentences();

            debug!(
                "Corpus batch fetched: offset={}, count={}",
                request.offset,
                sentences.len()
            );

            return Ok(sentences);
        }

        Err(last_error.unwrap_or(CorpusError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory corpus that serves `total` sentences and can fail at a given offset.
    pub struct FakeCorpus {
        pub total: usize,
        pub fail_at_offset: Option<usize>,
        pub requests: Mutex<Vec<usize>>,
    }

    impl FakeCorpus {
        pub fn new(total: usize) -> Self {
            Self {
                total,
                fail_at_offset: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SentenceCorpus for FakeCorpus {
        async fn fetch_batch(
            &self,
            request: BatchRequest<'_>,
        ) -> Result<Vec<CorpusSentence>, CorpusError> {
            self.requests.lock().unwrap().push(request.offset);
            if self.fail_at_offset == Some(request.offset) {
                return Err(CorpusError::Api {
                    status: 400,
                    message: "Mozilla API error: bad offset".to_string(),
                });
            }
            let end = (request.offset + request.limit).min(self.total);
            Ok((request.offset..end)
                .map(|i| CorpusSentence {
                    id: json!(i),
                    text: format!("sentence {i}"),
                    language_code: Some(request.language_code.to_string()),
                    source: None,
                    bucket: None,
                    hash: None,
                    version: None,
                    clips_count: None,
                    has_valid_clip: None,
                    is_validated: None,
                    taxonomy: None,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_array() {
        let body = r#"[{"id": 17, "text": "Neno mar Luo"}]"#;
        let sentences = serde_json::from_str::<SentencesPayload>(body)
            .unwrap()
            .into_sentences();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].mozilla_id(), "17");
    }

    #[test]
    fn test_parses_wrapped_payload_with_camel_case() {
        let body = r#"{"sentences": [{"id": "abc", "text": "Kisumo", "clipsCount": 2, "languageCode": "luo"}]}"#;
        let sentences = serde_json::from_str::<SentencesPayload>(body)
            .unwrap()
            .into_sentences();
        assert_eq!(sentences[0].mozilla_id(), "abc");
        assert_eq!(sentences[0].clips_count, Some(2));
        assert_eq!(sentences[0].language_code.as_deref(), Some("luo"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = CorpusClient::new("https://example.org/api/v1/".to_string(), None);
        assert_eq!(client.base_url, "https://example.org/api/v1");
    }
}
