mod admin;
mod auth;
mod config;
mod corpus;
mod db;
mod errors;
mod models;
mod pagination;
mod recordings;
mod reviews;
mod routes;
mod sentences;
mod state;
mod stats;
mod users;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::corpus::CorpusClient;
use crate::db::{create_pool, run_migrations};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("voice_api={},tower_http={}", &config.rust_log, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Voice API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let corpus = Arc::new(CorpusClient::new(
        config.corpus_api_url.clone(),
        config.corpus_api_token.clone(),
    ));
    info!(
        "Corpus client initialized ({}, language {})",
        config.corpus_api_url, config.sentence_language
    );
    if config.admin_email.is_none() {
        info!("ADMIN_EMAIL not set; only existing admin accounts can sign in");
    }

    let state = AppState {
        db,
        config: config.clone(),
        corpus,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
