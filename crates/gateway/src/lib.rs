//! HTTP gateway for DermaChat.
//!
//! Serves the single chat page plus the v1 session API, and a health check.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::{Router, http::HeaderValue, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use dermachat_agent::RagPipeline;
use dermachat_config::AppConfig;

/// Build the full router: health, v1 API and the embedded page.
///
/// Layers applied:
/// - CORS limited to the gateway's own origin
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: api_v1::SharedApiState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let port = config.gateway.port;
    let origins: Vec<HeaderValue> = [config.gateway.host.as_str(), "localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| format!("http://{host}:{port}").parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// The pipeline and its HTTP clients are built once and shared by every
/// session.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let missing = config.missing_keys();
    if !missing.is_empty() {
        tracing::warn!(?missing, "API keys missing; submissions will fail until configured");
    }

    let pipeline = RagPipeline::from_config(&config);
    let client = dermachat_providers::http_client(config.request_timeout_secs);
    info!(
        source = %config.context.source,
        top_k = config.retrieval.top_k,
        "Pipeline ready"
    );

    let state = Arc::new(api_v1::ApiV1State::new(pipeline, config, client));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> api_v1::SharedApiState {
        let config = AppConfig::default();
        let pipeline = RagPipeline::from_config(&config);
        Arc::new(api_v1::ApiV1State::new(
            pipeline,
            config,
            dermachat_providers::http_client(5),
        ))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn v1_is_nested() {
        let app = build_router(test_state());

        let req = Request::builder()
            .method("POST")
            .uri("/v1/sessions?tratamiento=Metotrexato%2015%20mg")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: api_v1::SessionCreatedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.context.tratamiento, "Metotrexato 15 mg");
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let app = build_router(test_state());

        let big = format!(r#"{{"message":"{}"}}"#, "a".repeat(2 * 1024 * 1024));
        let req = Request::builder()
            .method("POST")
            .uri("/v1/sessions/any/messages")
            .header("content-type", "application/json")
            .body(Body::from(big))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn start_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        let rt = tokio::runtime::Runtime::new().unwrap();
        assert!(rt.block_on(start(config)).is_err());
    }
}
