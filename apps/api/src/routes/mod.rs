pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::auth::handlers as auth;
use crate::recordings::handlers as recordings;
use crate::reviews::handlers as reviews;
use crate::sentences::handlers as sentences;
use crate::state::AppState;
use crate::stats::handlers as stats;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth and profile
        .route("/api/v1/auth/signup", post(auth::handle_signup))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/admin/login", post(auth::handle_admin_login))
        .route("/api/v1/auth/session", get(auth::handle_session))
        .route("/api/v1/auth/route", get(auth::handle_route))
        .route(
            "/api/v1/profile",
            get(auth::handle_get_profile).patch(auth::handle_update_profile),
        )
        // Sentences
        .route(
            "/api/v1/sentences/available",
            get(sentences::handle_available_sentences),
        )
        .route(
            "/api/v1/sentences/can-record",
            get(sentences::handle_can_record),
        )
        .route("/api/v1/sentences/stats", get(sentences::handle_sentence_stats))
        // Recordings
        .route("/api/v1/recordings", post(recordings::handle_create_recording))
        .route("/api/v1/recordings/mine", get(recordings::handle_my_recordings))
        .route("/api/v1/recordings/:id", get(recordings::handle_get_recording))
        .route(
            "/api/v1/recordings/:id/audio",
            get(recordings::handle_recording_audio),
        )
        // Reviews
        .route("/api/v1/reviews", post(reviews::handle_create_review))
        .route("/api/v1/reviews/queue", get(reviews::handle_review_queue))
        .route("/api/v1/reviews/mine", get(reviews::handle_my_reviews))
        .route("/api/v1/dashboard", get(stats::handle_dashboard))
        // Admin
        .route("/api/v1/admin/stats", get(admin::handle_system_stats))
        .route("/api/v1/admin/users", get(admin::handle_list_users))
        .route("/api/v1/admin/users/export", get(admin::handle_export_users))
        .route(
            "/api/v1/admin/users/:id",
            get(admin::handle_user_details).delete(admin::handle_delete_user),
        )
        .route(
            "/api/v1/admin/users/:id/approve",
            post(admin::handle_approve_user),
        )
        .route(
            "/api/v1/admin/users/:id/reject",
            post(admin::handle_reject_user),
        )
        .route("/api/v1/admin/recordings", get(admin::handle_list_recordings))
        .route(
            "/api/v1/admin/recordings/export",
            get(admin::handle_export_recordings),
        )
        .route(
            "/api/v1/admin/recordings/:id/review",
            get(admin::handle_recording_review),
        )
        .route(
            "/api/v1/admin/leaderboard/contributors",
            get(admin::handle_top_contributors),
        )
        .route(
            "/api/v1/admin/leaderboard/reviewers",
            get(admin::handle_top_reviewers),
        )
        .route("/api/v1/admin/activity", get(admin::handle_recent_activity))
        .route("/api/v1/admin/statements", get(admin::handle_statements))
        .route(
            "/api/v1/admin/sentences/import",
            post(admin::handle_import_sentences),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::corpus::fake::FakeCorpus;

    /// Router over a lazy pool; only requests that never reach the
    /// database can be exercised here.
    fn test_router() -> Router {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState {
            db,
            config,
            corpus: Arc::new(FakeCorpus::new(0)),
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "voice-api");
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let payload = json!({
            "email": "otieno@example.org",
            "password": "abc",
            "role": "contributor"
        });
        let response = test_router()
            .oneshot(
                Request::post("/api/v1/auth/signup")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protected_route_without_session() {
        let response = test_router()
            .oneshot(
                Request::get("/api/v1/recordings/mine")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_with_malformed_session() {
        let response = test_router()
            .oneshot(
                Request::get("/api/v1/admin/users")
                    .header("x-user-id", "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let config = Config::for_tests();
        let oversized = "a".repeat(config.body_limit_bytes() + 1);
        let payload = json!({
            "email": "otieno@example.org",
            "password": oversized,
            "role": "contributor"
        });
        let response = test_router()
            .oneshot(
                Request::post("/api/v1/auth/signup")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
