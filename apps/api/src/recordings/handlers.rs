use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::session::{require_contributor, require_reviewer_or_admin, CurrentUser};
use crate::errors::AppError;
use crate::models::recording::Recording;
use crate::models::user::User;
use crate::recordings::audio::{client_metadata, decode_data_url, is_data_url, quality_for_duration};
use crate::recordings::filters::DashboardFilter;
use crate::recordings::queries::{
    create_recording, get_recording_by_id, get_recordings_by_user, NewRecording, RecordingInsert,
};
use crate::sentences::allocation::Allocation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateRecordingRequest {
    pub sentence: String,
    pub audio_url: String,
    pub duration: f64,
}

fn is_http_url(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn validate_request(req: &CreateRecordingRequest) -> Result<(), AppError> {
    if req.sentence.trim().is_empty() {
        return Err(AppError::Validation("Sentence is required".to_string()));
    }
    if !req.duration.is_finite() || req.duration < 0.0 {
        return Err(AppError::Validation(
            "Duration must be a non-negative number of seconds".to_string(),
        ));
    }
    let audio_url = req.audio_url.trim();
    if audio_url.is_empty() {
        return Err(AppError::Validation("Audio is required".to_string()));
    }
    if !is_data_url(audio_url) && !is_http_url(audio_url) {
        return Err(AppError::Validation(
            "Audio must be a data URL or an http(s) URL".to_string(),
        ));
    }
    Ok(())
}

/// The 409 returned when the allocation rule refuses a recording.
fn refusal(allocation: Allocation) -> AppError {
    let message = match allocation {
        Allocation::AlreadyRecorded => "You have already recorded this sentence",
        Allocation::Full | Allocation::Open => "This sentence already has enough recordings",
    };
    AppError::Conflict(message.to_string())
}

/// Owners see their recordings; approved reviewers and admins see all.
fn ensure_can_view(user: &User, recording: &Recording) -> Result<(), AppError> {
    if recording.user_id == user.id {
        return Ok(());
    }
    require_reviewer_or_admin(user)
}

/// POST /api/v1/recordings
pub async fn handle_create_recording(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    Json(req): Json<CreateRecordingRequest>,
) -> Result<(StatusCode, Json<Recording>), AppError> {
    require_contributor(&user)?;
    validate_request(&req)?;

    let audio_url = req.audio_url.trim();
    if is_data_url(audio_url) {
        decode_data_url(audio_url, state.config.max_audio_bytes)?;
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let new = NewRecording {
        user_id: user.id,
        sentence: req.sentence.trim().to_string(),
        audio_url: audio_url.to_string(),
        duration: req.duration,
        quality: quality_for_duration(req.duration),
        metadata: client_metadata(user_agent),
    };
    let recording = match create_recording(
        &state.db,
        &new,
        state.config.max_contributors_per_sentence,
    )
    .await?
    {
        RecordingInsert::Created(recording) => recording,
        RecordingInsert::Refused(allocation) => return Err(refusal(allocation)),
    };

    info!(
        "Recording {} created by {} ({:.1}s, {})",
        recording.id,
        user.id,
        recording.duration,
        recording.quality.as_str()
    );
    Ok((StatusCode::CREATED, Json(recording)))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordingCounts {
    pub total_recordings: usize,
    pub today_recordings: usize,
}

pub fn recording_counts(recordings: &[Recording], now: DateTime<Utc>) -> RecordingCounts {
    let today = now.date_naive();
    RecordingCounts {
        total_recordings: recordings.len(),
        today_recordings: recordings
            .iter()
            .filter(|r| r.created_at.date_naive() == today)
            .count(),
    }
}

#[derive(Serialize)]
pub struct MyRecordingsResponse {
    pub recordings: Vec<Recording>,
    #[serde(flatten)]
    pub counts: RecordingCounts,
}

/// GET /api/v1/recordings/mine
pub async fn handle_my_recordings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DashboardFilter>,
) -> Result<Json<MyRecordingsResponse>, AppError> {
    let now = Utc::now();
    let all = get_recordings_by_user(&state.db, user.id).await?;
    let counts = recording_counts(&all, now);
    let recordings = filter.apply_to_recordings(all, now);
    Ok(Json(MyRecordingsResponse { recordings, counts }))
}

async fn load_visible_recording(
    state: &AppState,
    user: &User,
    id: Uuid,
) -> Result<Recording, AppError> {
    let recording = get_recording_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recording {id} not found")))?;
    ensure_can_view(user, &recording)?;
    Ok(recording)
}

/// GET /api/v1/recordings/:id
pub async fn handle_get_recording(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Recording>, AppError> {
    Ok(Json(load_visible_recording(&state, &user, id).await?))
}

/// GET /api/v1/recordings/:id/audio
///
/// Data URLs are decoded and served as bytes; anything else is treated as a
/// remote location and redirected to.
pub async fn handle_recording_audio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let recording = load_visible_recording(&state, &user, id).await?;

    if !is_data_url(&recording.audio_url) {
        return Ok(Redirect::temporary(&recording.audio_url).into_response());
    }

    // Stored audio may predate the current size limit.
    let audio = decode_data_url(&recording.audio_url, usize::MAX)?;
    Ok(([(header::CONTENT_TYPE, audio.mime)], audio.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording::fixtures::recording;
    use crate::models::recording::RecordingStatus;
    use crate::models::user::{fixtures, Role, UserStatus};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_validate_request() {
        let mut req = CreateRecordingRequest {
            sentence: "Koth biro".to_string(),
            audio_url: "data:audio/webm;base64,AAEC".to_string(),
            duration: 3.0,
        };
        assert!(validate_request(&req).is_ok());
        req.duration = -1.0;
        assert!(validate_request(&req).is_err());
        req.duration = f64::NAN;
        assert!(validate_request(&req).is_err());
        req.duration = 2.0;
        req.sentence = "   ".to_string();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_refusal_messages() {
        let err = refusal(Allocation::AlreadyRecorded);
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.to_string().contains("already recorded"));
        assert!(refusal(Allocation::Full)
            .to_string()
            .contains("enough recordings"));
    }

    #[test]
    fn test_audio_url_scheme() {
        let mut req = CreateRecordingRequest {
            sentence: "Koth biro".to_string(),
            audio_url: "https://cdn.example.org/clip.webm".to_string(),
            duration: 3.0,
        };
        assert!(validate_request(&req).is_ok());
        req.audio_url = "HTTP://cdn.example.org/clip.webm".to_string();
        assert!(validate_request(&req).is_ok());
        for bad in ["javascript:alert(1)", "file:///etc/passwd", "ftp://example.org/a", "clip.webm"] {
            req.audio_url = bad.to_string();
            assert!(validate_request(&req).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_view_rules() {
        let owner = fixtures::user(Role::Contributor, UserStatus::Active);
        let other = fixtures::user(Role::Contributor, UserStatus::Active);
        let reviewer = fixtures::user(Role::Reviewer, UserStatus::Active);
        let pending = fixtures::user(Role::Reviewer, UserStatus::Pending);
        let rec = recording(owner.id, "Koth biro", RecordingStatus::Pending);

        assert!(ensure_can_view(&owner, &rec).is_ok());
        assert!(ensure_can_view(&reviewer, &rec).is_ok());
        assert!(ensure_can_view(&other, &rec).is_err());
        assert!(ensure_can_view(&pending, &rec).is_err());
    }

    #[test]
    fn test_recording_counts() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap();
        let user = Uuid::new_v4();
        let mut morning = recording(user, "a", RecordingStatus::Pending);
        morning.created_at = now - Duration::hours(10);
        let mut yesterday = recording(user, "b", RecordingStatus::Approved);
        yesterday.created_at = now - Duration::hours(20);

        assert_eq!(
            recording_counts(&[morning, yesterday], now),
            RecordingCounts {
                total_recordings: 2,
                today_recordings: 1
            }
        );
    }
}
