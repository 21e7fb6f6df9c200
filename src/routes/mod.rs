//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - the game API under `/api/v1/...`
/// - CORS (allow any origin/method/headers); narrow this for production
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Sessions
        .route("/api/v1/sessions/start", post(http::http_start_session))
        .route("/api/v1/sessions/:id/answer", post(http::http_submit_answer))
        .route("/api/v1/sessions/:id/end", post(http::http_end_session))
        // Daily pack + leaderboard
        .route("/api/v1/packs/daily/:date", get(http::http_daily_pack))
        .route("/api/v1/packs/daily/:date/status", get(http::http_daily_pack_status))
        .route("/api/v1/leaderboards/daily/:date", get(http::http_daily_leaderboard))
        .route("/api/v1/leaderboards/daily/:date/submit", post(http::http_submit_daily))
        .route("/api/v1/leaderboards/all-time", get(http::http_all_time_leaderboard))
        // Player profile
        .route("/api/v1/users/stats", get(http::http_user_stats))
        .route("/api/v1/users/history", get(http::http_user_history))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::GameSettings;
    use crate::error::{GameError, StoreError};
    use crate::identity::StaticTokenVerifier;
    use crate::seeds::{seed_users, seeded_store};
    use crate::util::FixedClock;

    const ALICE: &str = "Bearer alice-token";
    const BOB: &str = "Bearer bob-token";

    async fn app() -> Router {
        let store = Arc::new(seeded_store().await);
        let state = AppState::with_parts(
            store,
            &GameSettings::default(),
            Arc::new(StaticTokenVerifier::from_users(&seed_users())),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())),
        );
        build_router(Arc::new(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(a) = auth {
            req = req.header("authorization", a);
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = app().await;
        let (status, body) = call(&app, "GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn session_round_trip_over_http() {
        let app = app().await;
        let (status, started) = call(&app, "POST", "/api/v1/sessions/start", Some(ALICE), Some(json!({ "mode": "WHO_OLDER" }))).await;
        assert_eq!(status, StatusCode::OK);
        let id = started["session"]["id"].as_str().unwrap().to_string();
        let questions = started["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 10);
        assert!(questions[0]["celebrity_a"]["full_name"].is_string());
        assert!(questions[0]["celebrity_a"].get("date_of_birth").is_none());

        let template_id = questions[0]["id"].as_str().unwrap();
        let answer = json!({
            "template_id": template_id,
            "question_index": 0,
            "answer": { "mode": "WHO_OLDER", "choice": "A" },
            "response_time_ms": 1200
        });
        let uri = format!("/api/v1/sessions/{id}/answer");
        let (status, scored) = call(&app, "POST", &uri, Some(ALICE), Some(answer.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(scored["correct_answer"]["choice"].is_string());
        assert_eq!(scored["question_index"], 0);

        let (status, dup) = call(&app, "POST", &uri, Some(ALICE), Some(answer)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(dup["error"], "DUPLICATE_ATTEMPT");

        let end = format!("/api/v1/sessions/{id}/end");
        let (status, ended) = call(&app, "POST", &end, Some(BOB), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(ended["error"], "NOT_AUTHORIZED");

        let (status, ended) = call(&app, "POST", &end, Some(ALICE), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ended["questions_count"], 1);

        let (status, again) = call(&app, "POST", &end, Some(ALICE), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["error"], "ALREADY_ENDED");

        let (_, stats) = call(&app, "GET", "/api/v1/users/stats", Some(ALICE), None).await;
        assert_eq!(stats["games_played"], 1);
        let (_, history) = call(&app, "GET", "/api/v1/users/history?limit=5", Some(ALICE), None).await;
        assert_eq!(history["total_games"], 1);
    }

    #[tokio::test]
    async fn errors_map_to_statuses() {
        let app = app().await;
        let (status, body) = call(&app, "POST", "/api/v1/sessions/start", None, Some(json!({ "mode": "AGE_GUESS" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHENTICATED");

        let (status, body) = call(&app, "POST", "/api/v1/sessions/start", Some(ALICE), Some(json!({ "mode": "BOGUS" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_MODE");

        let (status, body) = call(&app, "POST", "/api/v1/sessions/start", Some(ALICE), Some(json!({ "mode": "DAILY_CHALLENGE" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MISSING_PACK_DATE");

        let uri = format!("/api/v1/sessions/{}/end", uuid::Uuid::new_v4());
        let (status, body) = call(&app, "POST", &uri, Some(ALICE), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "SESSION_NOT_FOUND");

        let (status, body) = call(&app, "GET", "/api/v1/packs/daily/2025-13-01", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_DATE");

        let (status, body) = call(&app, "POST", "/api/v1/leaderboards/daily/2025-06-01/submit", Some(BOB), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NO_COMPLETED_SESSION");
    }

    #[tokio::test]
    async fn daily_flow_reaches_the_leaderboard() {
        let app = app().await;
        let (status, pack) = call(&app, "GET", "/api/v1/packs/daily/2025-06-01", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pack["is_completed"], false);
        let pack_ids: Vec<Value> = pack["questions"].as_array().unwrap().iter().map(|q| q["id"].clone()).collect();

        for auth in [ALICE, BOB] {
            let (status, started) = call(
                &app,
                "POST",
                "/api/v1/sessions/start",
                Some(auth),
                Some(json!({ "mode": "DAILY_CHALLENGE", "pack_date": "2025-06-01" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            let ids: Vec<Value> = started["questions"].as_array().unwrap().iter().map(|q| q["id"].clone()).collect();
            assert_eq!(ids, pack_ids);
            let id = started["session"]["id"].as_str().unwrap().to_string();
            let (status, _) = call(&app, "POST", &format!("/api/v1/sessions/{id}/end"), Some(auth), None).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, board) = call(&app, "GET", "/api/v1/leaderboards/daily/2025-06-01?limit=10", Some(BOB), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board["total_players"], 2);
        // Both scored zero: shared rank.
        assert_eq!(board["entries"][0]["rank"], 1);
        assert_eq!(board["entries"][1]["rank"], 1);
        assert_eq!(board["entries"][0]["display_name"], "Alice");
        assert_eq!(board["entries"][1]["display_name"], "Anonymous");
        assert_eq!(board["current_user_rank"], 1);

        let (_, status) = call(&app, "GET", "/api/v1/packs/daily/2025-06-01/status", Some(ALICE), None).await;
        assert_eq!(status["completed"], true);
        assert_eq!(status["score"], 0);

        let (_, mine) = call(&app, "GET", "/api/v1/packs/daily/2025-06-01", Some(ALICE), None).await;
        assert_eq!(mine["is_completed"], true);
    }

    async fn play_daily(app: &Router, auth: &str, date: &str) {
        let (status, started) = call(
            app,
            "POST",
            "/api/v1/sessions/start",
            Some(auth),
            Some(json!({ "mode": "DAILY_CHALLENGE", "pack_date": date })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = started["session"]["id"].as_str().unwrap().to_string();
        let (status, _) = call(app, "POST", &format!("/api/v1/sessions/{id}/end"), Some(auth), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn daily_board_is_readable_without_credentials() {
        let app = app().await;
        play_daily(&app, ALICE, "2025-06-01").await;

        let (status, board) = call(&app, "GET", "/api/v1/leaderboards/daily/2025-06-01", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board["total_players"], 1);
        assert_eq!(board["entries"][0]["display_name"], "Alice");
        assert_eq!(board["entries"][0]["is_current_user"], false);
        assert!(board["current_user_rank"].is_null());
        assert!(board["current_user_score"].is_null());

        let (status, body) = call(&app, "GET", "/api/v1/leaderboards/daily/2025-06-01", Some("Bearer nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn all_time_board_over_http() {
        let app = app().await;
        let (status, empty) = call(&app, "GET", "/api/v1/leaderboards/all-time", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty["total_players"], 0);
        assert_eq!(empty["entries"], json!([]));

        play_daily(&app, ALICE, "2025-06-01").await;
        play_daily(&app, ALICE, "2025-05-31").await;

        let (status, anon) = call(&app, "GET", "/api/v1/leaderboards/all-time?limit=5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(anon["total_players"], 1);
        let top = &anon["entries"][0];
        assert_eq!(top["rank"], 1);
        assert_eq!(top["display_name"], "Alice");
        assert_eq!(top["games_played"], 2);
        assert_eq!(top["lifetime_score"], 0);
        assert!(anon["current_user_rank"].is_null());

        let (_, mine) = call(&app, "GET", "/api/v1/leaderboards/all-time", Some(ALICE), None).await;
        assert_eq!(mine["current_user_rank"], 1);
        assert_eq!(mine["entries"][0]["is_current_user"], true);

        let (_, bobs) = call(&app, "GET", "/api/v1/leaderboards/all-time", Some(BOB), None).await;
        assert!(bobs["current_user_rank"].is_null());
    }

    #[tokio::test]
    async fn malformed_counts_get_a_json_error() {
        let app = app().await;
        for (uri, auth) in [
            ("/api/v1/leaderboards/daily/2025-06-01?limit=-1", None),
            ("/api/v1/leaderboards/all-time?limit=lots", None),
            ("/api/v1/users/history?offset=-3", Some(ALICE)),
        ] {
            let (status, body) = call(&app, "GET", uri, auth, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "INVALID_QUERY", "{uri}");
            assert!(body["message"].as_str().unwrap().contains("non-negative integer"));
        }
    }

    #[tokio::test]
    async fn storage_outage_maps_to_503() {
        let resp = GameError::Storage(StoreError::Unavailable("pool exhausted".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "STORAGE_UNAVAILABLE");
        assert_eq!(body["message"], "storage unavailable: pool exhausted");
    }
}
