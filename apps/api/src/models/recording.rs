use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Pending,
    Approved,
    Rejected,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Pending => "pending",
            RecordingStatus::Approved => "approved",
            RecordingStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for RecordingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(RecordingStatus::Pending),
            "approved" => Ok(RecordingStatus::Approved),
            "rejected" => Ok(RecordingStatus::Rejected),
            _ => Err(UnknownVariant::new("recording status", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Good,
    Fair,
    Poor,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "good",
            Quality::Fair => "fair",
            Quality::Poor => "poor",
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "good" => Ok(Quality::Good),
            "fair" => Ok(Quality::Fair),
            "poor" => Ok(Quality::Poor),
            _ => Err(UnknownVariant::new("quality", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recording {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sentence: String,
    pub audio_url: String,
    pub audio_blob: Option<String>,
    /// Seconds.
    pub duration: f64,
    #[sqlx(try_from = "String")]
    pub status: RecordingStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub quality: Quality,
    pub metadata: Value,
}

impl Recording {
    pub fn is_reviewed(&self) -> bool {
        self.status != RecordingStatus::Pending
    }
}

/// The (sentence, contributor) pair the allocation rule counts over.
#[derive(Debug, Clone, FromRow)]
pub struct SentenceContribution {
    pub sentence: String,
    pub user_id: Uuid,
}
