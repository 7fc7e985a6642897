//! HTTP gateway: `POST /ask` and `GET /health`.
//!
//! The gateway owns no conversation logic. It maps the `message` field of the
//! request body (plus an optional `conversation_id`) onto
//! [`Session::respond_in`] and returns the reply as `reply`.

pub mod api;

use crate::agent::Session;
use crate::config::{Config, GatewayConfig};
use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state for all gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: AppState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/ask", post(api::handle_ask))
        .route(
            "/conversations/{id}",
            delete(api::handle_end_conversation),
        )
        .route("/health", get(api::handle_health))
        .layer(RequestBodyLimitLayer::new(gateway.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            gateway.request_timeout_secs,
        )))
        .with_state(state)
}

/// Run the gateway until ctrl-c.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let session = Session::from_config(&config).context("Failed to initialize responder")?;
    let mode = session.mode();
    let state = AppState::new(session);
    let app = build_router(state, &config.gateway);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway to {addr}"))?;
    let local = listener.local_addr()?;

    tracing::info!(addr = %local, %mode, "Gateway listening");
    println!("🤖 supportbot gateway on http://{local} ({mode} mode)");
    println!("  POST /ask     - {{\"message\": \"...\"}}");
    println!("  DELETE /conversations/{{id}} - forget a conversation");
    println!("  GET  /health  - liveness");
    println!("  Press Ctrl+C to stop.\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::providers::{ChatMessage, Provider};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FailingProvider;

    /// Records every payload it is sent and answers "ok".
    #[derive(Default)]
    struct RecordingProvider {
        calls: Arc<parking_lot::Mutex<Vec<Vec<ChatMessage>>>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn chat_with_history(
            &self,
            messages: &[ChatMessage],
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            self.calls.lock().push(messages.to_vec());
            Ok("ok".into())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn live_router(provider: RecordingProvider) -> Router {
        let session = Session::with_provider(Box::new(provider), &AgentConfig::default());
        build_router(AppState::new(session), &GatewayConfig::default())
    }

    #[async_trait]
    impl Provider for FailingProvider {
        async fn chat_with_history(
            &self,
            _messages: &[ChatMessage],
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            anyhow::bail!("OpenAI API error (429 Too Many Requests): quota exceeded")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn mock_router() -> Router {
        let state = AppState::new(Session::mock(&AgentConfig::default()));
        build_router(state, &GatewayConfig::default())
    }

    fn ask(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn ask_returns_mock_reply() {
        let response = mock_router()
            .oneshot(ask(r#"{"message":"How do I reset my password?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let reply = body["reply"].as_str().unwrap();
        assert!(reply.contains("15 minutes"));
    }

    #[tokio::test]
    async fn ask_accepts_empty_message() {
        let response = mock_router()
            .oneshot(ask(r#"{"message":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["reply"].as_str().unwrap().starts_with("(Mock)"));
    }

    #[tokio::test]
    async fn ask_rejects_missing_message_field() {
        let response = mock_router().oneshot(ask(r#"{"text":"hi"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn ask_rejects_malformed_json() {
        let response = mock_router().oneshot(ask("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ask_rejects_oversized_body() {
        let gateway = GatewayConfig {
            max_body_bytes: 32,
            ..GatewayConfig::default()
        };
        let app = build_router(AppState::new(Session::mock(&AgentConfig::default())), &gateway);
        let body = format!(r#"{{"message":"{}"}}"#, "x".repeat(100));
        let response = app.oneshot(ask(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn live_failure_maps_to_500_with_detail() {
        let session = Session::with_provider(Box::new(FailingProvider), &AgentConfig::default());
        let app = build_router(AppState::new(session), &GatewayConfig::default());

        let response = app.oneshot(ask(r#"{"message":"hi"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Error processing message: "));
        assert!(detail.contains("quota exceeded"));
        assert!(body.get("reply").is_none());
    }

    #[tokio::test]
    async fn live_requests_without_conversation_share_nothing() {
        let provider = RecordingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let app = live_router(provider);

        let first = ask(r#"{"message":"client A: my email is alice@example.com order 4411"}"#);
        assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::OK);
        let second = ask(r#"{"message":"client B: hi"}"#);
        assert_eq!(app.oneshot(second).await.unwrap().status(), StatusCode::OK);

        let calls = calls.lock();
        assert_eq!(calls.len(), 2);
        for message in &calls[1] {
            assert!(!message.content.contains("client A"), "leaked: {message:?}");
        }
        assert_eq!(calls[1].last().unwrap(), &ChatMessage::user("client B: hi"));
    }

    #[tokio::test]
    async fn live_conversation_id_scopes_history() {
        let provider = RecordingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let app = live_router(provider);

        for body in [
            r#"{"message":"order 4411","conversation_id":"a"}"#,
            r#"{"message":"hello","conversation_id":"b"}"#,
            r#"{"message":"where is it?","conversation_id":"a"}"#,
        ] {
            let response = app.clone().oneshot(ask(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let calls = calls.lock();
        assert!(calls[1].iter().all(|m| !m.content.contains("4411")));
        let third: Vec<&str> = calls[2].iter().skip(1).map(|m| m.content.as_str()).collect();
        assert_eq!(third, ["order 4411", "ok", "where is it?"]);
    }

    #[tokio::test]
    async fn delete_conversation_forgets_history() {
        let provider = RecordingProvider::default();
        let calls = Arc::clone(&provider.calls);
        let app = live_router(provider);

        let body = r#"{"message":"order 4411","conversation_id":"a"}"#;
        app.clone().oneshot(ask(body)).await.unwrap();

        let forget = || {
            Request::delete("/conversations/a")
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(forget()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.clone().oneshot(forget()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        app.oneshot(ask(r#"{"message":"again","conversation_id":"a"}"#))
            .await
            .unwrap();
        assert_eq!(calls.lock()[1].len(), 2);
    }

    #[tokio::test]
    async fn health_reports_mode() {
        let response = mock_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mode"], "mock");
        assert_eq!(body["memory"], "none");
        assert!(body["session_id"].is_string());
        assert!(body["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = mock_router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
