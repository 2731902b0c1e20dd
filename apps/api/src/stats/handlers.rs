use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::user::Role;
use crate::recordings::queries::{get_all_recordings, get_recordings_by_user};
use crate::reviews::queries::{get_all_reviews, get_reviews_written_by};
use crate::stats::compute::{
    system_stats, user_stats, weekly_activity, DayActivity, SystemStats, UserStats,
};
use crate::state::AppState;
use crate::users::queries::get_all_users;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: UserStats,
    pub weekly_activity: Vec<DayActivity>,
    /// Admins also get the system-wide numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemStats>,
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let now = Utc::now();

    let (recordings, reviews) = match user.role {
        Role::Admin => (
            get_all_recordings(&state.db).await?,
            get_all_reviews(&state.db).await?,
        ),
        _ => (
            get_recordings_by_user(&state.db, user.id).await?,
            get_reviews_written_by(&state.db, user.id).await?,
        ),
    };

    let own_recordings: Vec<_> = recordings.iter().filter(|r| r.user_id == user.id).collect();
    let own_reviews: Vec<_> = reviews.iter().filter(|r| r.reviewer_id == user.id).collect();
    let stats = user_stats(user.id, &own_recordings, &own_reviews, now);

    let system = if user.role == Role::Admin {
        let users = get_all_users(&state.db).await?;
        Some(system_stats(&users, &recordings, &reviews))
    } else {
        None
    };

    Ok(Json(DashboardResponse {
        stats,
        weekly_activity: weekly_activity(&user, &recordings, &reviews, now),
        system,
    }))
}
