use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::admin::cascade::DeleteSummary;
use crate::admin::csv::{export_filename, recordings_csv, users_csv};
use crate::admin::filters::{users_by_id, RecordingListFilter, UserListFilter};
use crate::auth::session::{require_admin, CurrentUser};
use crate::corpus::statements::fetch_all_sentences;
use crate::corpus::CorpusSentence;
use crate::errors::AppError;
use crate::models::recording::Recording;
use crate::models::review::{Review, ReviewWithRecording};
use crate::models::user::{User, UserStatus};
use crate::pagination::{paginate, Page, PageQuery, PAGE_SIZE};
use crate::recordings::queries::{
    get_all_recordings, get_recording_by_id, get_recordings_by_reviewer, get_recordings_by_user,
};
use crate::reviews::queries::{get_reviews_by_recording, get_reviews_by_reviewer};
use crate::sentences::queries::insert_corpus_sentences;
use crate::state::AppState;
use crate::stats::compute::{ActivityEntry, SystemStats, UserStats, UserWithStats};
use crate::stats::queries::{
    get_all_user_stats, get_recent_activity, get_system_stats, get_top_contributors,
    get_top_reviewers, get_user_stats, DEFAULT_ACTIVITY_LIMIT, DEFAULT_LEADERBOARD_LIMIT,
};
use crate::users::queries::{delete_user, get_all_users, get_user_by_id, set_user_status};

fn csv_response(filename: String, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/v1/admin/stats
pub async fn handle_system_stats(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<SystemStats>, AppError> {
    require_admin(&admin)?;
    Ok(Json(get_system_stats(&state.db).await?))
}

// ──────────────────────────────────────────────────────────────
// Users
// ──────────────────────────────────────────────────────────────

async fn filtered_users(
    state: &AppState,
    filter: &UserListFilter,
) -> Result<Vec<UserWithStats>, AppError> {
    Ok(get_all_user_stats(&state.db)
        .await?
        .into_iter()
        .filter(|row| filter.matches(&row.user))
        .collect())
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(filter): Query<UserListFilter>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Page<UserWithStats>>, AppError> {
    require_admin(&admin)?;
    let rows = filtered_users(&state, &filter).await?;
    Ok(Json(paginate(rows, paging.page(), PAGE_SIZE)))
}

/// GET /api/v1/admin/users/export
pub async fn handle_export_users(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(filter): Query<UserListFilter>,
) -> Result<Response, AppError> {
    require_admin(&admin)?;
    let rows = filtered_users(&state, &filter).await?;
    info!("Admin {} exported {} users", admin.id, rows.len());
    Ok(csv_response(
        export_filename("users", Utc::now().date_naive()),
        users_csv(&rows),
    ))
}

#[derive(Serialize)]
pub struct UserDetails {
    pub user: User,
    pub recordings: Vec<Recording>,
    /// Recordings this user signed off on as reviewer.
    pub reviewed_recordings: Vec<Recording>,
    pub reviews: Vec<ReviewWithRecording>,
    pub stats: UserStats,
}

/// GET /api/v1/admin/users/:id
pub async fn handle_user_details(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetails>, AppError> {
    require_admin(&admin)?;
    let user = get_user_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    Ok(Json(UserDetails {
        recordings: get_recordings_by_user(&state.db, id).await?,
        reviewed_recordings: get_recordings_by_reviewer(&state.db, id).await?,
        reviews: get_reviews_by_reviewer(&state.db, id).await?,
        stats: get_user_stats(&state.db, id).await?,
        user,
    }))
}

async fn update_status(
    state: &AppState,
    admin: &User,
    id: Uuid,
    status: UserStatus,
    is_active: bool,
) -> Result<Json<User>, AppError> {
    require_admin(admin)?;
    let user = set_user_status(&state.db, id, status, is_active)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    info!(
        "Admin {} set user {} to {}",
        admin.id,
        user.id,
        status.as_str()
    );
    Ok(Json(user))
}

/// POST /api/v1/admin/users/:id/approve
pub async fn handle_approve_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    update_status(&state, &admin, id, UserStatus::Active, true).await
}

/// POST /api/v1/admin/users/:id/reject
pub async fn handle_reject_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    update_status(&state, &admin, id, UserStatus::Rejected, false).await
}

/// DELETE /api/v1/admin/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteSummary>, AppError> {
    require_admin(&admin)?;
    if id == admin.id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    let summary = delete_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    info!("Admin {} deleted user {}", admin.id, id);
    Ok(Json(summary))
}

// ──────────────────────────────────────────────────────────────
// Recordings
// ──────────────────────────────────────────────────────────────

/// A recording with the people around it resolved, as listed to admins.
#[derive(Serialize)]
pub struct AdminRecording {
    #[serde(flatten)]
    pub recording: Recording,
    pub contributor_name: Option<String>,
    pub contributor_email: Option<String>,
    pub reviewer_name: Option<String>,
}

async fn filtered_recordings(
    state: &AppState,
    filter: &RecordingListFilter,
) -> Result<(Vec<Recording>, Vec<User>), AppError> {
    let users = get_all_users(&state.db).await?;
    let all = get_all_recordings(&state.db).await?;
    let recordings = {
        let lookup = users_by_id(&users);
        all.into_iter()
            .filter(|r| filter.matches(r, &lookup))
            .collect()
    };
    Ok((recordings, users))
}

/// GET /api/v1/admin/recordings
pub async fn handle_list_recordings(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(filter): Query<RecordingListFilter>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Page<AdminRecording>>, AppError> {
    require_admin(&admin)?;
    let (recordings, users) = filtered_recordings(&state, &filter).await?;
    let lookup = users_by_id(&users);

    let page = paginate(recordings, paging.page(), PAGE_SIZE);
    let items = page
        .items
        .into_iter()
        .map(|recording| {
            let contributor = lookup.get(&recording.user_id);
            AdminRecording {
                contributor_name: contributor.and_then(|u| u.name.clone()),
                contributor_email: contributor.map(|u| u.email.clone()),
                reviewer_name: recording
                    .reviewed_by
                    .and_then(|id| lookup.get(&id))
                    .map(|u| u.display_name().to_string()),
                recording,
            }
        })
        .collect();

    Ok(Json(Page {
        items,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }))
}

/// GET /api/v1/admin/recordings/export
pub async fn handle_export_recordings(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(filter): Query<RecordingListFilter>,
) -> Result<Response, AppError> {
    require_admin(&admin)?;
    let (recordings, users) = filtered_recordings(&state, &filter).await?;
    info!("Admin {} exported {} recordings", admin.id, recordings.len());
    Ok(csv_response(
        export_filename("recordings", Utc::now().date_naive()),
        recordings_csv(&recordings, &users_by_id(&users)),
    ))
}

#[derive(Serialize)]
pub struct ReviewInfo {
    pub review: Review,
    pub reviewer: User,
}

/// The review written by the recording's `reviewed_by` user, if any.
fn find_review_by_marked_reviewer(recording: &Recording, reviews: Vec<Review>) -> Option<Review> {
    let reviewer_id = recording.reviewed_by?;
    reviews.into_iter().find(|r| r.reviewer_id == reviewer_id)
}

/// GET /api/v1/admin/recordings/:id/review
pub async fn handle_recording_review(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewInfo>, AppError> {
    require_admin(&admin)?;
    let not_reviewed = || AppError::NotFound("This recording has not been reviewed yet.".to_string());

    let recording = get_recording_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Recording {id} not found")))?;
    let reviews = get_reviews_by_recording(&state.db, id).await?;
    let review = find_review_by_marked_reviewer(&recording, reviews).ok_or_else(not_reviewed)?;
    let reviewer = get_user_by_id(&state.db, review.reviewer_id)
        .await?
        .ok_or_else(not_reviewed)?;

    Ok(Json(ReviewInfo { review, reviewer }))
}

// ──────────────────────────────────────────────────────────────
// Leaderboards and activity
// ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/admin/leaderboard/contributors
pub async fn handle_top_contributors(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<UserWithStats>>, AppError> {
    require_admin(&admin)?;
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(get_top_contributors(&state.db, limit).await?))
}

/// GET /api/v1/admin/leaderboard/reviewers
pub async fn handle_top_reviewers(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<UserWithStats>>, AppError> {
    require_admin(&admin)?;
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(get_top_reviewers(&state.db, limit).await?))
}

/// GET /api/v1/admin/activity
pub async fn handle_recent_activity(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    require_admin(&admin)?;
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Ok(Json(get_recent_activity(&state.db, limit).await?))
}

// ──────────────────────────────────────────────────────────────
// Corpus
// ──────────────────────────────────────────────────────────────

async fn load_corpus(state: &AppState) -> Result<Vec<CorpusSentence>, AppError> {
    fetch_all_sentences(
        state.corpus.as_ref(),
        &state.config.sentence_language,
        &state.config.corpus_licence,
    )
    .await
    .map_err(|e| AppError::Corpus(e.user_message()))
}

/// GET /api/v1/admin/statements?page=
pub async fn handle_statements(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Page<CorpusSentence>>, AppError> {
    require_admin(&admin)?;
    let sentences = load_corpus(&state).await?;
    Ok(Json(paginate(sentences, paging.page(), PAGE_SIZE)))
}

#[derive(Serialize)]
pub struct ImportSummary {
    pub fetched: usize,
    pub inserted: u64,
}

/// POST /api/v1/admin/sentences/import
pub async fn handle_import_sentences(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
) -> Result<Json<ImportSummary>, AppError> {
    require_admin(&admin)?;
    let sentences = load_corpus(&state).await?;
    let inserted =
        insert_corpus_sentences(&state.db, &sentences, &state.config.sentence_language).await?;
    info!("Admin {} imported {} sentences", admin.id, inserted);
    Ok(Json(ImportSummary {
        fetched: sentences.len(),
        inserted,
    }))
}
