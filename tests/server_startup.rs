//! Server startup tests
//!
//! Verify that application state wires up from configuration and that the
//! router exposes the expected endpoints.

use std::sync::Arc;

use axum::{Router, body::Body, http::Request};
use tower::util::ServiceExt;

use sdr_gateway::{ServerConfig, config::AgentConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        openai_api_key: Some("test-key".to_string()),
        openai_base_url: None,
        crm_webhook_url: Some("http://localhost:9/hooks/call".to_string()),
        twilio_account_sid: None,
        twilio_auth_token: None,
        agent: AgentConfig::default(),
    }
}

fn build_app() -> Router {
    let app_state =
        Arc::new(AppState::from_config(create_minimal_config()).expect("state should assemble"));
    Router::new()
        .route(
            "/",
            axum::routing::get(sdr_gateway::handlers::api::health_check),
        )
        .merge(routes::relay::create_relay_router())
        .with_state(app_state)
}

#[tokio::test]
async fn test_state_requires_api_key() {
    let mut config = create_minimal_config();
    config.openai_api_key = None;
    assert!(AppState::from_config(config).is_err());
}

#[tokio::test]
async fn test_health_check_responds() {
    let app = build_app();

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn test_relay_endpoint_exists() {
    let app = build_app();

    let request = Request::builder()
        .uri("/relay?correlation_id=crm-1")
        .header("upgrade", "websocket")
        .header("connection", "upgrade")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .header("sec-websocket-version", "13")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    // Should respond (either upgrade or bad request, not 404)
    assert_ne!(response.status(), axum::http::StatusCode::NOT_FOUND);
}
