use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::Role;
use crate::recordings::queries::{get_all_recordings, get_recordings_by_user};
use crate::reviews::queries::{get_all_reviews, get_reviews_written_by};
use crate::stats::compute::{
    recent_activity, system_stats, top_contributors, top_reviewers, user_stats, ActivityEntry,
    StatsIndex, SystemStats, UserStats, UserWithStats,
};
use crate::users::queries::{get_all_users, get_users_by_role};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;

pub async fn get_system_stats(pool: &PgPool) -> Result<SystemStats> {
    let users = get_all_users(pool).await?;
    let recordings = get_all_recordings(pool).await?;
    let reviews = get_all_reviews(pool).await?;
    Ok(system_stats(&users, &recordings, &reviews))
}

pub async fn get_user_stats(pool: &PgPool, user_id: Uuid) -> Result<UserStats> {
    let recordings = get_recordings_by_user(pool, user_id).await?;
    let reviews = get_reviews_written_by(pool, user_id).await?;
    let recordings: Vec<_> = recordings.iter().collect();
    let reviews: Vec<_> = reviews.iter().collect();
    Ok(user_stats(user_id, &recordings, &reviews, Utc::now()))
}

/// Stats for every user, in `get_all_users` order.
pub async fn get_all_user_stats(pool: &PgPool) -> Result<Vec<UserWithStats>> {
    let users = get_all_users(pool).await?;
    let recordings = get_all_recordings(pool).await?;
    let reviews = get_all_reviews(pool).await?;
    let index = StatsIndex::build(&recordings, &reviews);
    let now = Utc::now();
    Ok(users
        .into_iter()
        .map(|user| UserWithStats {
            stats: index.for_user(user.id, now),
            user,
        })
        .collect())
}

pub async fn get_top_contributors(pool: &PgPool, limit: usize) -> Result<Vec<UserWithStats>> {
    let contributors = get_users_by_role(pool, Role::Contributor).await?;
    let recordings = get_all_recordings(pool).await?;
    let reviews = get_all_reviews(pool).await?;
    let index = StatsIndex::build(&recordings, &reviews);
    Ok(top_contributors(contributors, &index, limit, Utc::now()))
}

pub async fn get_top_reviewers(pool: &PgPool, limit: usize) -> Result<Vec<UserWithStats>> {
    let reviewers = get_users_by_role(pool, Role::Reviewer).await?;
    let recordings = get_all_recordings(pool).await?;
    let reviews = get_all_reviews(pool).await?;
    let index = StatsIndex::build(&recordings, &reviews);
    Ok(top_reviewers(reviewers, &index, limit, Utc::now()))
}

pub async fn get_recent_activity(pool: &PgPool, limit: usize) -> Result<Vec<ActivityEntry>> {
    let users = get_all_users(pool).await?;
    let recordings = get_all_recordings(pool).await?;
    let reviews = get_all_reviews(pool).await?;
    Ok(recent_activity(&users, &recordings, &reviews, limit))
}
