//! The HTTP/JSON surface over `voting-core` (SPEC_FULL.md §6). [`build_router`]
//! is separated from `main` so integration tests can drive the full stack
//! with `tower::ServiceExt::oneshot` against a [`voting_store::MemoryStore`],
//! without binding a socket.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/election/create", post(handlers::election::create))
        .route("/election/:id/status", put(handlers::election::set_status))
        .route("/election/:id/tally", post(handlers::election::tally))
        .route("/election/:id/results", get(handlers::election::results))
        .route("/trustee/key-ceremony", post(handlers::trustee::key_ceremony))
        .route("/trustee/submit-decryption-share", post(handlers::trustee::submit_decryption_share))
        .route("/code-sheet/generate-bulk", post(handlers::code_sheet::generate_bulk))
        .route("/token/request-signature", post(handlers::token::request_signature))
        .route("/vote-submission/submit", post(handlers::vote_submission::submit))
        .route("/bulletin/append", post(handlers::bulletin::append))
        .route("/bulletin/:election_id/chain", get(handlers::bulletin::chain))
        .route("/bulletin/:election_id/verify", get(handlers::bulletin::verify))
        .route("/healthz", get(handlers::health::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use voting_crypto::AuthorityKeys;
    use voting_store::MemoryStore;

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(AuthorityKeys::generate_ephemeral().unwrap()),
            Arc::new(Config {
                database_url: "memory".into(),
                listen_addr: "127.0.0.1:0".into(),
                debug: true,
                bulletin_service_url: None,
                jwt_secret_key: None,
                access_token_expire_minutes: None,
                refresh_token_expire_days: None,
                allowed_origins: vec![],
                safe_prime_bits: 2048,
            }),
        )
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let app = build_router(test_state());
        let response = app.oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "ok");
    }

    #[tokio::test]
    async fn create_election_then_lookup_unknown_status_is_rejected() {
        let app = build_router(test_state());

        let create_request = Request::post("/election/create")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "title": "Board seat",
                    "start_time": "2026-01-01T00:00:00Z",
                    "end_time": "2026-01-02T00:00:00Z",
                    "threshold_t": 2,
                    "total_trustees_n": 3
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(create_request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let election_id = body["election_id"].as_str().unwrap();

        // DRAFT -> TALLIED skips ACTIVE/CLOSED and must be rejected.
        let bad_transition = Request::put(format!("/election/{election_id}/status"))
            .header("content-type", "application/json")
            .body(Body::from(json!({"status": "TALLIED"}).to_string()))
            .unwrap();
        let response = app.oneshot(bad_transition).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bulletin_append_then_chain_and_verify_round_trip() {
        let app = build_router(test_state());
        let election_id = uuid::Uuid::new_v4();

        for payload in [json!({"a": 1}), json!({"b": 2})] {
            let request = Request::post("/bulletin/append")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"election_id": election_id, "entry_type": "ELECTION_CREATED", "entry_data": payload}).to_string(),
                ))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let verify_request = Request::get(format!("/bulletin/{election_id}/verify")).body(Body::empty()).unwrap();
        let response = app.oneshot(verify_request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["total_entries"], 2);
    }
}
