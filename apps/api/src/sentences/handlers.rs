use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::session::{require_contributor, CurrentUser};
use crate::errors::AppError;
use crate::models::sentence::Sentence;
use crate::recordings::queries::{get_contributions_for_sentence, get_sentence_contributions};
use crate::sentences::allocation::{
    available_sentences_for_user, can_record, sentence_stats, SentenceStats,
};
use crate::sentences::queries::get_active_sentences;
use crate::state::AppState;

const DEFAULT_AVAILABLE_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct AvailableQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct AvailableResponse {
    pub sentences: Vec<Sentence>,
    /// How many sentences are open to the user before the limit is applied.
    pub remaining: usize,
}

/// GET /api/v1/sentences/available?limit=
pub async fn handle_available_sentences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<AvailableQuery>,
) -> Result<Json<AvailableResponse>, AppError> {
    require_contributor(&user)?;

    let sentences = get_active_sentences(&state.db, &state.config.sentence_language).await?;
    let contributions = get_sentence_contributions(&state.db).await?;
    let available = available_sentences_for_user(
        sentences,
        &contributions,
        user.id,
        state.config.max_contributors_per_sentence,
    );

    let remaining = available.len();
    let limit = params.limit.unwrap_or(DEFAULT_AVAILABLE_LIMIT).max(1);
    Ok(Json(AvailableResponse {
        sentences: available.into_iter().take(limit).collect(),
        remaining,
    }))
}

#[derive(Deserialize)]
pub struct SentenceQuery {
    pub sentence: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanRecordResponse {
    pub can_record: bool,
    #[serde(flatten)]
    pub stats: SentenceStats,
}

/// GET /api/v1/sentences/can-record?sentence=
pub async fn handle_can_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<SentenceQuery>,
) -> Result<Json<CanRecordResponse>, AppError> {
    require_contributor(&user)?;

    let sentence = params.sentence.trim();
    let contributions = get_contributions_for_sentence(&state.db, sentence).await?;
    Ok(Json(CanRecordResponse {
        can_record: can_record(
            &contributions,
            user.id,
            sentence,
            state.config.max_contributors_per_sentence,
        ),
        stats: sentence_stats(&contributions, sentence),
    }))
}

/// GET /api/v1/sentences/stats?sentence=
pub async fn handle_sentence_stats(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(params): Query<SentenceQuery>,
) -> Result<Json<SentenceStats>, AppError> {
    let sentence = params.sentence.trim();
    let contributions = get_contributions_for_sentence(&state.db, sentence).await?;
    Ok(Json(sentence_stats(&contributions, sentence)))
}
