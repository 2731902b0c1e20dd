use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::recording::Recording;
use crate::models::review::Review;

/// Everything that goes away with a user: their recordings, the reviews they
/// wrote and the reviews attached to their recordings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    pub user_id: Uuid,
    pub recording_ids: BTreeSet<Uuid>,
    pub review_ids: BTreeSet<Uuid>,
}

impl CascadePlan {
    pub fn build(user_id: Uuid, recordings: &[Recording], reviews: &[Review]) -> Self {
        let recording_ids: BTreeSet<Uuid> = recordings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        let owned: HashSet<Uuid> = recording_ids.iter().copied().collect();
        let review_ids = reviews
            .iter()
            .filter(|r| r.reviewer_id == user_id || owned.contains(&r.recording_id))
            .map(|r| r.id)
            .collect();
        Self {
            user_id,
            recording_ids,
            review_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_recordings: u64,
    pub deleted_reviews: u64,
}

/// Runs the plan in one transaction, reviews first. Returns `None` when the
/// user row was already gone, in which case nothing is committed.
pub async fn execute(pool: &PgPool, plan: &CascadePlan) -> Result<Option<DeleteSummary>> {
    let mut tx = pool.begin().await.context("Failed to begin user delete")?;

    let review_ids: Vec<Uuid> = plan.review_ids.iter().copied().collect();
    let deleted_reviews = sqlx::query("DELETE FROM reviews WHERE id = ANY($1)")
        .bind(&review_ids)
        .execute(&mut *tx)
        .await
        .context("Failed to delete reviews")?
        .rows_affected();

    let recording_ids: Vec<Uuid> = plan.recording_ids.iter().copied().collect();
    let deleted_recordings = sqlx::query("DELETE FROM recordings WHERE id = ANY($1)")
        .bind(&recording_ids)
        .execute(&mut *tx)
        .await
        .context("Failed to delete recordings")?
        .rows_affected();

    let deleted_users = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(plan.user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete user")?
        .rows_affected();

    if deleted_users == 0 {
        tx.rollback().await.context("Failed to roll back user delete")?;
        return Ok(None);
    }

    tx.commit().await.context("Failed to commit user delete")?;
    info!(
        "Deleted user {} with {} recordings and {} reviews",
        plan.user_id, deleted_recordings, deleted_reviews
    );
    Ok(Some(DeleteSummary {
        deleted_recordings,
        deleted_reviews,
    }))
}
