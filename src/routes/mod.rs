//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (lesson sessions)
/// - REST-ish API under `/api/v1/...` (deck, dashboard progress, example sentences)
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/words", get(http::http_get_words))
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/sentence", post(http::http_post_sentence))
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
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::AgentConfig;

    fn app() -> Router {
        let state = AppState::from_parts(AgentConfig::default(), None).unwrap();
        build_router(Arc::new(state))
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["ok"], true);
    }

    #[tokio::test]
    async fn words_lists_the_deck_in_order() {
        let res = app()
            .oneshot(Request::get("/api/v1/words").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v = json_body(res).await;
        let words = v["words"].as_array().unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0]["id"], "wp1");
        assert_eq!(words[4]["pureWord"], "Bersiv");
    }

    #[tokio::test]
    async fn progress_starts_from_seed_numbers() {
        let res = app()
            .oneshot(Request::get("/api/v1/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let v = json_body(res).await;
        assert_eq!(v["points"], 320);
        assert_eq!(v["streak"], 4);
    }

    #[tokio::test]
    async fn sentence_uses_fallback_and_404s_on_unknown_word() {
        let req = |id: &str| {
            Request::post("/api/v1/sentence")
                .header("content-type", "application/json")
                .body(Body::from(format!(r#"{{"wordId":"{id}"}}"#)))
                .unwrap()
        };
        let res = app().oneshot(req("wp5")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["sentence"], "Ez îro pir Cewab im.");
        assert_eq!(v["source"], "fallback");

        let res = app().oneshot(req("missing")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
