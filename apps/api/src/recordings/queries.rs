use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::models::recording::{Quality, Recording, RecordingStatus, SentenceContribution};
use crate::sentences::allocation::{check_allocation, Allocation};

#[derive(Debug, Clone)]
pub struct NewRecording {
    pub user_id: Uuid,
    pub sentence: String,
    pub audio_url: String,
    pub duration: f64,
    pub quality: Quality,
    pub metadata: Value,
}

async fn insert_recording<'e, E>(executor: E, new: &NewRecording) -> Result<Recording>
where
    E: Executor<'e, Database = Postgres>,
{
    Ok(sqlx::query_as::<_, Recording>(
        r#"
        INSERT INTO recordings
            (id, user_id, sentence, audio_url, duration, status, quality, metadata,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(&new.sentence)
    .bind(&new.audio_url)
    .bind(new.duration)
    .bind(new.quality.as_str())
    .bind(&new.metadata)
    .fetch_one(executor)
    .await
    .context("Failed to create recording")?)
}

#[derive(Debug)]
pub enum RecordingInsert {
    Created(Recording),
    /// Blocked by the allocation rule; nothing was written.
    Refused(Allocation),
}

/// Inserts the recording only if the sentence is still open to the user.
///
/// The check and the insert share one transaction holding an advisory lock on
/// the sentence text, so concurrent submits for the same sentence run one at
/// a time and see each other's rows.
pub async fn create_recording(
    pool: &PgPool,
    new: &NewRecording,
    cap: usize,
) -> Result<RecordingInsert> {
    let mut tx = pool.begin().await.context("Failed to begin recording insert")?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&new.sentence)
        .execute(&mut *tx)
        .await
        .context("Failed to lock sentence")?;

    let contributions = get_contributions_for_sentence(&mut *tx, &new.sentence).await?;
    match check_allocation(&contributions, new.user_id, &new.sentence, cap) {
        Allocation::Open => {}
        refused => {
            tx.rollback()
                .await
                .context("Failed to roll back recording insert")?;
            return Ok(RecordingInsert::Refused(refused));
        }
    }

    let recording = insert_recording(&mut *tx, new).await?;
    tx.commit().await.context("Failed to commit recording")?;
    Ok(RecordingInsert::Created(recording))
}

pub async fn get_recording_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Recording>> {
    Ok(
        sqlx::query_as::<_, Recording>("SELECT * FROM recordings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get recording")?,
    )
}

/// A contributor's recordings, newest first.
pub async fn get_recordings_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Recording>> {
    Ok(sqlx::query_as::<_, Recording>(
        "SELECT * FROM recordings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to get recordings by user")?)
}

pub async fn get_recordings_by_status(
    pool: &PgPool,
    status: RecordingStatus,
) -> Result<Vec<Recording>> {
    Ok(sqlx::query_as::<_, Recording>(
        "SELECT * FROM recordings WHERE status = $1 ORDER BY created_at DESC",
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await
    .context("Failed to get recordings by status")?)
}

pub async fn get_recordings_by_reviewer(pool: &PgPool, reviewer_id: Uuid) -> Result<Vec<Recording>> {
    Ok(sqlx::query_as::<_, Recording>(
        "SELECT * FROM recordings WHERE reviewed_by = $1 ORDER BY reviewed_at DESC NULLS LAST",
    )
    .bind(reviewer_id)
    .fetch_all(pool)
    .await
    .context("Failed to get recordings by reviewer")?)
}

/// Marks a pending recording as reviewed. Returns `None` when the recording is
/// gone or was already reviewed.
pub async fn update_recording_review(
    conn: &mut PgConnection,
    id: Uuid,
    status: RecordingStatus,
    reviewer_id: Uuid,
) -> Result<Option<Recording>> {
    Ok(sqlx::query_as::<_, Recording>(
        r#"
        UPDATE recordings
        SET status = $2, reviewed_by = $3, reviewed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(reviewer_id)
    .fetch_optional(conn)
    .await
    .context("Failed to update recording review")?)
}

pub async fn get_all_recordings(pool: &PgPool) -> Result<Vec<Recording>> {
    Ok(
        sqlx::query_as::<_, Recording>("SELECT * FROM recordings ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
            .context("Failed to get recordings")?,
    )
}

/// Every (sentence, contributor) pair, for the allocation rule.
pub async fn get_sentence_contributions(pool: &PgPool) -> Result<Vec<SentenceContribution>> {
    Ok(
        sqlx::query_as::<_, SentenceContribution>("SELECT sentence, user_id FROM recordings")
            .fetch_all(pool)
            .await
            .context("Failed to get sentence contributions")?,
    )
}

pub async fn get_contributions_for_sentence<'e, E>(
    executor: E,
    sentence: &str,
) -> Result<Vec<SentenceContribution>>
where
    E: Executor<'e, Database = Postgres>,
{
    Ok(sqlx::query_as::<_, SentenceContribution>(
        "SELECT sentence, user_id FROM recordings WHERE sentence = $1",
    )
    .bind(sentence)
    .fetch_all(executor)
    .await
    .context("Failed to get contributions for sentence")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;
    use crate::models::user::{NewUser, Role, UserStatus};
    use crate::users::queries::create_user;
    use sqlx::postgres::PgPoolOptions;

    const CAP: usize = 3;

    async fn test_pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must point at a scratch database");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn contributor(pool: &PgPool) -> Uuid {
        create_user(
            pool,
            &NewUser {
                email: format!("{}@example.org", Uuid::new_v4()),
                password: "secret1".to_string(),
                role: Role::Contributor,
                status: UserStatus::Active,
                profile_complete: true,
                name: None,
                is_active: true,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn new_recording(user_id: Uuid, sentence: &str) -> NewRecording {
        NewRecording {
            user_id,
            sentence: sentence.to_string(),
            audio_url: "data:audio/webm;base64,AAEC".to_string(),
            duration: 3.0,
            quality: Quality::Good,
            metadata: serde_json::json!({}),
        }
    }

    async fn rows_for(pool: &PgPool, sentence: &str) -> usize {
        get_contributions_for_sentence(pool, sentence).await.unwrap().len()
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL at TEST_DATABASE_URL
    async fn test_second_recording_of_same_sentence_is_refused() {
        let pool = test_pool().await;
        let user = contributor(&pool).await;
        let sentence = format!("Koth biro {}", Uuid::new_v4());
        let new = new_recording(user, &sentence);

        let first = create_recording(&pool, &new, CAP).await.unwrap();
        assert!(matches!(first, RecordingInsert::Created(_)));
        let second = create_recording(&pool, &new, CAP).await.unwrap();
        assert!(matches!(
            second,
            RecordingInsert::Refused(Allocation::AlreadyRecorded)
        ));
        assert_eq!(rows_for(&pool, &sentence).await, 1);
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL at TEST_DATABASE_URL
    async fn test_concurrent_submits_by_one_user_insert_once() {
        let pool = test_pool().await;
        for _ in 0..10 {
            let user = contributor(&pool).await;
            let sentence = format!("Chiemo ni mit {}", Uuid::new_v4());
            let new = new_recording(user, &sentence);

            let (a, b) = tokio::join!(
                create_recording(&pool, &new, CAP),
                create_recording(&pool, &new, CAP)
            );
            let created = [a.unwrap(), b.unwrap()]
                .iter()
                .filter(|r| matches!(r, RecordingInsert::Created(_)))
                .count();
            assert_eq!(created, 1);
            assert_eq!(rows_for(&pool, &sentence).await, 1);
        }
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL at TEST_DATABASE_URL
    async fn test_concurrent_contributors_stop_at_cap() {
        let pool = test_pool().await;
        let sentence = format!("Nyathi ringo {}", Uuid::new_v4());

        let mut handles = Vec::new();
        for _ in 0..5 {
            let user = contributor(&pool).await;
            let pool = pool.clone();
            let new = new_recording(user, &sentence);
            handles.push(tokio::spawn(async move {
                create_recording(&pool, &new, CAP).await.unwrap()
            }));
        }

        let mut created = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                RecordingInsert::Created(_) => created += 1,
                RecordingInsert::Refused(Allocation::Full) => full += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!((created, full), (CAP, 2));
        assert_eq!(rows_for(&pool, &sentence).await, CAP);
    }
}
