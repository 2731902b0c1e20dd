use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::corpus::SentenceCorpus;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Sentence corpus source. Default: `CorpusClient` against the public API.
    pub corpus: Arc<dyn SentenceCorpus>,
}
