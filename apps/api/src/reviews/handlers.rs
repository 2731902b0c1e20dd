use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::session::{require_reviewer, require_reviewer_or_admin, CurrentUser};
use crate::errors::AppError;
use crate::models::recording::{Recording, RecordingStatus};
use crate::models::review::{Decision, Review, ReviewWithRecording};
use crate::recordings::filters::DashboardFilter;
use crate::recordings::queries::{get_recording_by_id, get_recordings_by_status};
use crate::reviews::queries::{create_review, get_reviews_by_reviewer, NewReview};
use crate::state::AppState;

const DEFAULT_CONFIDENCE: i32 = 100;

#[derive(Deserialize)]
pub struct QueueQuery {
    /// Comma-separated recording ids the reviewer skipped this session.
    pub skip: Option<String>,
}

/// Unparseable ids are ignored.
fn parse_skip_list(raw: Option<&str>) -> HashSet<Uuid> {
    raw.unwrap_or_default()
        .split(',')
        .filter_map(|s| Uuid::parse_str(s.trim()).ok())
        .collect()
}

#[derive(Serialize)]
pub struct QueueResponse {
    pub recordings: Vec<Recording>,
    pub total: usize,
}

/// GET /api/v1/reviews/queue?skip=
pub async fn handle_review_queue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<QueueQuery>,
) -> Result<Json<QueueResponse>, AppError> {
    require_reviewer_or_admin(&user)?;

    let skipped = parse_skip_list(params.skip.as_deref());
    let recordings: Vec<Recording> = get_recordings_by_status(&state.db, RecordingStatus::Pending)
        .await?
        .into_iter()
        .filter(|r| !skipped.contains(&r.id))
        .collect();

    Ok(Json(QueueResponse {
        total: recordings.len(),
        recordings,
    }))
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub recording_id: Uuid,
    pub decision: Decision,
    pub notes: Option<String>,
    pub confidence: Option<i32>,
    pub time_spent: Option<i32>,
}

/// Validates the request and fills in defaults.
fn build_review(reviewer_id: Uuid, req: CreateReviewRequest) -> Result<NewReview, AppError> {
    let confidence = req.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    if !(0..=100).contains(&confidence) {
        return Err(AppError::Validation(
            "Confidence must be between 0 and 100".to_string(),
        ));
    }
    let time_spent = req.time_spent.unwrap_or(0);
    if time_spent < 0 {
        return Err(AppError::Validation(
            "Time spent cannot be negative".to_string(),
        ));
    }
    let notes = req
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| req.decision.default_notes().to_string());

    Ok(NewReview {
        recording_id: req.recording_id,
        reviewer_id,
        decision: req.decision,
        notes,
        confidence,
        time_spent,
    })
}

#[derive(Serialize)]
pub struct CreateReviewResponse {
    pub review: Review,
    pub recording: Recording,
}

/// POST /api/v1/reviews
pub async fn handle_create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<CreateReviewResponse>), AppError> {
    require_reviewer(&user)?;
    let new = build_review(user.id, req)?;

    let existing = get_recording_by_id(&state.db, new.recording_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recording {} not found", new.recording_id)))?;
    if existing.is_reviewed() {
        return Err(AppError::Conflict(
            "This recording has already been reviewed".to_string(),
        ));
    }

    let (review, recording) = create_review(&state.db, &new).await?.ok_or_else(|| {
        AppError::Conflict("This recording has already been reviewed".to_string())
    })?;

    info!(
        "Recording {} {} by reviewer {}",
        recording.id,
        review.decision.as_str(),
        user.id
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateReviewResponse { review, recording }),
    ))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCounts {
    pub total_reviews: usize,
    pub today_reviews: usize,
}

pub fn review_counts(reviews: &[ReviewWithRecording], now: DateTime<Utc>) -> ReviewCounts {
    let today = now.date_naive();
    ReviewCounts {
        total_reviews: reviews.len(),
        today_reviews: reviews
            .iter()
            .filter(|r| r.review.created_at.date_naive() == today)
            .count(),
    }
}

#[derive(Serialize)]
pub struct MyReviewsResponse {
    pub reviews: Vec<ReviewWithRecording>,
    #[serde(flatten)]
    pub counts: ReviewCounts,
}

/// GET /api/v1/reviews/mine
pub async fn handle_my_reviews(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DashboardFilter>,
) -> Result<Json<MyReviewsResponse>, AppError> {
    let now = Utc::now();
    let all = get_reviews_by_reviewer(&state.db, user.id).await?;
    let counts = review_counts(&all, now);
    let reviews = filter.apply_to_reviews(all, now);
    Ok(Json(MyReviewsResponse { reviews, counts }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::fixtures::review;
    use chrono::{Duration, TimeZone};

    fn request(decision: Decision) -> CreateReviewRequest {
        CreateReviewRequest {
            recording_id: Uuid::new_v4(),
            decision,
            notes: None,
            confidence: None,
            time_spent: None,
        }
    }

    #[test]
    fn test_defaults_filled_in() {
        let new = build_review(Uuid::new_v4(), request(Decision::Rejected)).unwrap();
        assert_eq!(new.confidence, 100);
        assert_eq!(new.time_spent, 0);
        assert_eq!(new.notes, "Quality issues detected");
    }

    #[test]
    fn test_blank_notes_replaced() {
        let mut req = request(Decision::Approved);
        req.notes = Some("   ".to_string());
        assert_eq!(
            build_review(Uuid::new_v4(), req).unwrap().notes,
            "Good quality recording"
        );
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut req = request(Decision::Approved);
        req.confidence = Some(101);
        assert!(build_review(Uuid::new_v4(), req).is_err());

        let mut req = request(Decision::Approved);
        req.time_spent = Some(-3);
        assert!(build_review(Uuid::new_v4(), req).is_err());
    }

    #[test]
    fn test_skip_list_parsing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let skipped = parse_skip_list(Some(&format!("{a}, {b},bogus,")));
        assert_eq!(skipped.len(), 2);
        assert!(skipped.contains(&a) && skipped.contains(&b));
        assert!(parse_skip_list(None).is_empty());
    }

    #[test]
    fn test_review_counts() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut today = review(Uuid::new_v4(), Uuid::new_v4(), Decision::Approved);
        today.created_at = now - Duration::hours(1);
        let mut earlier = review(Uuid::new_v4(), Uuid::new_v4(), Decision::Rejected);
        earlier.created_at = now - Duration::days(2);
        let history: Vec<ReviewWithRecording> = [today, earlier]
            .into_iter()
            .map(|review| ReviewWithRecording {
                review,
                recording: None,
            })
            .collect();

        assert_eq!(
            review_counts(&history, now),
            ReviewCounts {
                total_reviews: 2,
                today_reviews: 1
            }
        );
    }
}
