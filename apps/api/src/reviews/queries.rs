use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::recording::Recording;
use crate::models::review::{Decision, Review, ReviewHistoryRow, ReviewWithRecording};
use crate::recordings::queries::update_recording_review;

#[derive(Debug, Clone)]
pub struct NewReview {
    pub recording_id: Uuid,
    pub reviewer_id: Uuid,
    pub decision: Decision,
    pub notes: String,
    pub confidence: i32,
    pub time_spent: i32,
}

/// Stores a review and moves its recording out of `pending` in one
/// transaction. Returns `None` (and writes nothing) when the recording is
/// missing or was already reviewed.
pub async fn create_review(
    pool: &PgPool,
    new: &NewReview,
) -> Result<Option<(Review, Recording)>> {
    let mut tx = pool.begin().await.context("Failed to begin review")?;

    let Some(recording) = update_recording_review(
        &mut *tx,
        new.recording_id,
        new.decision.recording_status(),
        new.reviewer_id,
    )
    .await?
    else {
        tx.rollback().await.context("Failed to roll back review")?;
        return Ok(None);
    };

    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews
            (id, recording_id, reviewer_id, decision, notes, confidence, time_spent, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.recording_id)
    .bind(new.reviewer_id)
    .bind(new.decision.as_str())
    .bind(&new.notes)
    .bind(new.confidence)
    .bind(new.time_spent)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to insert review")?;

    tx.commit().await.context("Failed to commit review")?;
    Ok(Some((review, recording)))
}

/// A reviewer's history, newest first, each with its recording summary.
pub async fn get_reviews_by_reviewer(
    pool: &PgPool,
    reviewer_id: Uuid,
) -> Result<Vec<ReviewWithRecording>> {
    let rows = sqlx::query_as::<_, ReviewHistoryRow>(
        r#"
        SELECT v.id, v.recording_id, v.reviewer_id, v.decision, v.notes,
               v.confidence, v.time_spent, v.created_at,
               r.id AS rec_id, r.sentence AS rec_sentence, r.audio_url AS rec_audio_url,
               r.duration AS rec_duration, r.quality AS rec_quality,
               r.status AS rec_status, r.created_at AS rec_created_at
        FROM reviews v
        LEFT JOIN recordings r ON r.id = v.recording_id
        WHERE v.reviewer_id = $1
        ORDER BY v.created_at DESC
        "#,
    )
    .bind(reviewer_id)
    .fetch_all(pool)
    .await
    .context("Failed to get reviews by reviewer")?;

    rows.into_iter()
        .map(|row| ReviewWithRecording::try_from(row).map_err(anyhow::Error::from))
        .collect()
}

/// Plain review rows written by a reviewer, newest first.
pub async fn get_reviews_written_by(pool: &PgPool, reviewer_id: Uuid) -> Result<Vec<Review>> {
    Ok(sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE reviewer_id = $1 ORDER BY created_at DESC",
    )
    .bind(reviewer_id)
    .fetch_all(pool)
    .await
    .context("Failed to get reviews written by reviewer")?)
}

pub async fn get_reviews_by_recording(pool: &PgPool, recording_id: Uuid) -> Result<Vec<Review>> {
    Ok(sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE recording_id = $1 ORDER BY created_at DESC",
    )
    .bind(recording_id)
    .fetch_all(pool)
    .await
    .context("Failed to get reviews by recording")?)
}

pub async fn get_all_reviews(pool: &PgPool) -> Result<Vec<Review>> {
    Ok(
        sqlx::query_as::<_, Review>("SELECT * FROM reviews ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .context("Failed to get reviews")?,
    )
}
