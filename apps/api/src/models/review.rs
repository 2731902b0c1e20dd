use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::recording::{Quality, RecordingStatus};
use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }

    /// The status a recording takes once a review with this decision lands.
    pub fn recording_status(&self) -> RecordingStatus {
        match self {
            Decision::Approved => RecordingStatus::Approved,
            Decision::Rejected => RecordingStatus::Rejected,
        }
    }

    pub fn default_notes(&self) -> &'static str {
        match self {
            Decision::Approved => "Good quality recording",
            Decision::Rejected => "Quality issues detected",
        }
    }
}

impl TryFrom<String> for Decision {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(UnknownVariant::new("decision", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub reviewer_id: Uuid,
    #[sqlx(try_from = "String")]
    pub decision: Decision,
    pub notes: Option<String>,
    /// 0 – 100
    pub confidence: i32,
    /// Seconds spent listening before deciding.
    pub time_spent: i32,
    pub created_at: DateTime<Utc>,
}

/// Recording columns embedded in a reviewer's history.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingSummary {
    pub id: Uuid,
    pub sentence: String,
    pub audio_url: String,
    pub duration: f64,
    pub quality: Quality,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithRecording {
    #[serde(flatten)]
    pub review: Review,
    pub recording: Option<RecordingSummary>,
}

/// Flat join row; the recording side is NULL when the recording vanished.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewHistoryRow {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub reviewer_id: Uuid,
    pub decision: String,
    pub notes: Option<String>,
    pub confidence: i32,
    pub time_spent: i32,
    pub created_at: DateTime<Utc>,
    pub rec_id: Option<Uuid>,
    pub rec_sentence: Option<String>,
    pub rec_audio_url: Option<String>,
    pub rec_duration: Option<f64>,
    pub rec_quality: Option<String>,
    pub rec_status: Option<String>,
    pub rec_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewHistoryRow> for ReviewWithRecording {
    type Error = UnknownVariant;

    fn try_from(row: ReviewHistoryRow) -> Result<Self, Self::Error> {
        let recording = match (
            row.rec_id,
            row.rec_sentence,
            row.rec_audio_url,
            row.rec_quality,
            row.rec_status,
            row.rec_created_at,
        ) {
            (Some(id), Some(sentence), Some(audio_url), Some(quality), Some(status), Some(created_at)) => {
                Some(RecordingSummary {
                    id,
                    sentence,
                    audio_url,
                    duration: row.rec_duration.unwrap_or(0.0),
                    quality: Quality::try_from(quality)?,
                    status: RecordingStatus::try_from(status)?,
                    created_at,
                })
            }
            _ => None,
        };

        Ok(ReviewWithRecording {
            review: Review {
                id: row.id,
                recording_id: row.recording_id,
                reviewer_id: row.reviewer_id,
                decision: Decision::try_from(row.decision)?,
                notes: row.notes,
                confidence: row.confidence,
                time_spent: row.time_spent,
                created_at: row.created_at,
            },
            recording,
        })
    }
}
