use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::recording::Quality;

static MOBILE_UA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Mobile|Android|iPhone|iPad").expect("valid regex"));

/// Decoded `data:<mime>;base64,<payload>` audio.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Decodes a base64 data URL. Empty payloads and payloads over `max_bytes`
/// are rejected with the messages shown to contributors.
pub fn decode_data_url(url: &str, max_bytes: usize) -> Result<DataUrl, AppError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Validation("Audio must be a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Validation("Malformed audio data URL".to_string()))?;

    let mut parts = header.split(';');
    let mime = match parts.next() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "application/octet-stream".to_string(),
    };
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(AppError::Validation(
            "Audio data URL must be base64-encoded".to_string(),
        ));
    }

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(empty_blob());
    }
    // Reject on the encoded length before allocating the decoded buffer.
    if payload.len() / 4 * 3 > max_bytes.saturating_add(2) {
        return Err(too_large());
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| AppError::Validation(format!("Audio data is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(empty_blob());
    }
    if bytes.len() > max_bytes {
        return Err(too_large());
    }

    Ok(DataUrl { mime, bytes })
}

fn empty_blob() -> AppError {
    AppError::Validation("Audio blob is empty - recording may be corrupted".to_string())
}

fn too_large() -> AppError {
    AppError::PayloadTooLarge(
        "Audio file is too large. Please record a shorter audio clip.".to_string(),
    )
}

pub fn quality_for_duration(seconds: f64) -> Quality {
    if seconds > 1.0 && seconds < 15.0 {
        Quality::Good
    } else {
        Quality::Fair
    }
}

/// Device and browser of the submitting client, stored with the recording.
pub fn client_metadata(user_agent: &str) -> Value {
    let device = if MOBILE_UA.is_match(user_agent) {
        "mobile"
    } else {
        "desktop"
    };
    let browser = if user_agent.contains("Chrome") {
        "chrome"
    } else if user_agent.contains("Firefox") {
        "firefox"
    } else if user_agent.contains("Safari") {
        "safari"
    } else {
        "other"
    };
    json!({ "deviceType": device, "browserType": browser })
}
