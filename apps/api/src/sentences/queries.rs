use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::corpus::CorpusSentence;
use crate::models::sentence::{Difficulty, Sentence};

/// Active sentences for a language, in insertion order.
pub async fn get_active_sentences(pool: &PgPool, language_code: &str) -> Result<Vec<Sentence>> {
    Ok(sqlx::query_as::<_, Sentence>(
        r#"
        SELECT * FROM sentences
        WHERE language_code = $1 AND is_active = TRUE
        ORDER BY created_at, id
        "#,
    )
    .bind(language_code)
    .fetch_all(pool)
    .await
    .context("Failed to get active sentences")?)
}

/// Column values derived from one corpus sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceImport {
    pub mozilla_id: String,
    pub text: String,
    pub language_code: String,
    pub source: Option<String>,
    pub bucket: Option<String>,
    pub hash: Option<String>,
    pub version: i32,
    pub clips_count: i32,
    pub has_valid_clip: bool,
    pub is_validated: bool,
    pub taxonomy: Value,
    pub word_count: i32,
    pub character_count: i32,
    pub difficulty: Difficulty,
}

impl SentenceImport {
    pub fn from_corpus(sentence: &CorpusSentence, default_language: &str) -> Self {
        let text = sentence.text.trim().to_string();
        let word_count = text.split_whitespace().count();
        Self {
            mozilla_id: sentence.mozilla_id(),
            language_code: sentence
                .language_code
                .clone()
                .unwrap_or_else(|| default_language.to_string()),
            source: sentence.source.clone(),
            bucket: sentence.bucket.clone(),
            hash: sentence.hash.clone(),
            version: sentence.version.unwrap_or(1),
            clips_count: sentence.clips_count.unwrap_or(0),
            has_valid_clip: sentence.has_valid_clip.unwrap_or(false),
            is_validated: sentence.is_validated.unwrap_or(false),
            taxonomy: sentence.taxonomy.clone().unwrap_or_else(|| json!({})),
            word_count: word_count as i32,
            character_count: text.chars().count() as i32,
            difficulty: Difficulty::from_word_count(word_count),
            text,
        }
    }
}

/// Inserts corpus sentences, skipping any `mozilla_id` already stored.
/// Returns the number of new rows.
pub async fn insert_corpus_sentences(
    pool: &PgPool,
    sentences: &[CorpusSentence],
    default_language: &str,
) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin import")?;
    let mut inserted = 0;

    for sentence in sentences {
        let row = SentenceImport::from_corpus(sentence, default_language);
        if row.text.is_empty() {
            continue;
        }
        let result = sqlx::query(
            r#"
            INSERT INTO sentences
                (id, mozilla_id, text, language_code, source, bucket, hash, version,
                 clips_count, has_valid_clip, is_validated, taxonomy, metadata,
                 is_active, difficulty_level, word_count, character_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    TRUE, $14, $15, $16, clock_timestamp())
            ON CONFLICT (mozilla_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.mozilla_id)
        .bind(&row.text)
        .bind(&row.language_code)
        .bind(&row.source)
        .bind(&row.bucket)
        .bind(&row.hash)
        .bind(row.version)
        .bind(row.clips_count)
        .bind(row.has_valid_clip)
        .bind(row.is_validated)
        .bind(&row.taxonomy)
        .bind(json!({ "importedFrom": "corpus" }))
        .bind(row.difficulty.as_str())
        .bind(row.word_count)
        .bind(row.character_count)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert sentence {}", row.mozilla_id))?;
        inserted += result.rows_affected();
    }

    tx.commit().await.context("Failed to commit import")?;
    info!(
        "Imported {} new sentences ({} fetched)",
        inserted,
        sentences.len()
    );
    Ok(inserted)
}
