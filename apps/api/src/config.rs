use anyhow::{Context, Result};
use std::str::FromStr;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Language code of the sentences offered to contributors.
    pub sentence_language: String,
    /// Distinct contributors after which a sentence is retired.
    pub max_contributors_per_sentence: usize,
    /// Upper bound on decoded audio size for a single recording.
    pub max_audio_bytes: usize,
    pub corpus_api_url: String,
    pub corpus_api_token: Option<String>,
    pub corpus_licence: String,
    /// Bootstrap admin credentials. Admin login creates this account on first use.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            sentence_language: std::env::var("SENTENCE_LANGUAGE")
                .unwrap_or_else(|_| "luo".to_string()),
            max_contributors_per_sentence: parse_env("MAX_CONTRIBUTORS_PER_SENTENCE", 3)?,
            max_audio_bytes: parse_env("MAX_AUDIO_BYTES", 10 * 1024 * 1024)?,
            corpus_api_url: std::env::var("CORPUS_API_URL")
                .unwrap_or_else(|_| "https://commonvoice.mozilla.org/api/v1".to_string()),
            corpus_api_token: optional_env("CORPUS_API_TOKEN"),
            corpus_licence: std::env::var("CORPUS_LICENCE").unwrap_or_else(|_| "NOODL".to_string()),
            admin_email: optional_env("ADMIN_EMAIL").map(|e| e.trim().to_lowercase()),
            admin_password: optional_env("ADMIN_PASSWORD"),
        })
    }

    /// Request body cap: base64 inflates audio by 4/3, plus room for the JSON envelope.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_audio_bytes / 3 * 4 + 64 * 1024
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/voice_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            sentence_language: "luo".to_string(),
            max_contributors_per_sentence: 3,
            max_audio_bytes: 1024,
            corpus_api_url: "http://localhost:0".to_string(),
            corpus_api_token: None,
            corpus_licence: "NOODL".to_string(),
            admin_email: Some("admin@commonvoice.org".to_string()),
            admin_password: Some("admin-secret".to_string()),
        }
    }
}
