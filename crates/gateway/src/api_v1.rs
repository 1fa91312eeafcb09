//! HTTP API v1: chat sessions over the RAG pipeline.
//!
//! Endpoints:
//!
//! - `POST /v1/sessions`: Start a session (context from the query string)
//! - `GET /v1/sessions/{id}`: Render the transcript
//! - `PUT /v1/sessions/{id}/input`: Replace the pending input
//! - `POST /v1/sessions/{id}/submit`: Submit the pending input
//! - `POST /v1/sessions/{id}/messages`: Set the input and submit it
//! - `DELETE /v1/sessions/{id}`: End a session

use axum::{
    Router,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use dermachat_agent::{ChatSession, RagPipeline, SessionState, SubmitOutcome, source_for};
use dermachat_core::context::PatientContext;
use dermachat_core::error::{Error, SessionError};
use dermachat_core::message::Turn;

// ── State ─────────────────────────────────────────────────────────────────

/// One stored session. The creation time is kept outside the lock so
/// eviction never waits on a busy session.
pub struct SessionEntry {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub session: Arc<Mutex<ChatSession>>,
}

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub pipeline: RagPipeline,
    pub config: dermachat_config::AppConfig,
    /// HTTP client for the remote context strategy.
    pub client: reqwest::Client,
    pub sessions: RwLock<HashMap<String, SessionEntry>>,
}

pub type SharedApiState = Arc<ApiV1State>;

impl ApiV1State {
    pub fn new(
        pipeline: RagPipeline,
        config: dermachat_config::AppConfig,
        client: reqwest::Client,
    ) -> Self {
        Self {
            pipeline,
            config,
            client,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn session(&self, id: &str) -> Result<Arc<Mutex<ChatSession>>, ApiError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, SessionError::NotFound(id.into())))
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/input", put(set_input_handler))
        .route("/sessions/{id}/submit", post(submit_handler))
        .route("/sessions/{id}/messages", post(message_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct InputRequest {
    text: String,
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    pub id: String,
    pub state: SessionState,
    pub context: PatientContext,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub id: String,
    pub state: SessionState,
    pub turns: Vec<Turn>,
    pub pending_input: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn busy(id: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, SessionError::Busy(id.into()))
}

impl From<Error> for ErrorResponse {
    fn from(e: Error) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Provider(_) => StatusCode::BAD_GATEWAY,
        Error::Session(SessionError::Busy(_)) => StatusCode::CONFLICT,
        Error::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn create_session_handler(
    State(state): State<SharedApiState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let source = source_for(&state.config, query.as_deref(), state.client.clone());
    let session = ChatSession::start(source.as_ref()).await;

    let response = SessionCreatedResponse {
        id: session.id().to_string(),
        state: session.state(),
        context: session.context().clone(),
        warnings: session.warnings().to_vec(),
    };

    let mut sessions = state.sessions.write().await;

    // Evict oldest if at capacity
    if sessions.len() >= state.config.gateway.max_sessions {
        if let Some(oldest_key) = sessions
            .iter()
            .min_by_key(|(_, e)| e.created_at)
            .map(|(k, _)| k.clone())
        {
            info!(session = %oldest_key, "Evicting oldest session");
            sessions.remove(&oldest_key);
        }
    }

    sessions.insert(
        response.id.clone(),
        SessionEntry {
            created_at: session.created_at(),
            session: Arc::new(Mutex::new(session)),
        },
    );

    (StatusCode::CREATED, Json(response))
}

/// Waits for an in-flight submission to finish before rendering.
async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let handle = state.session(&id).await?;
    let mut session = handle.lock().await;

    let turns = session.render().to_vec();
    Ok(Json(SessionDetailResponse {
        id,
        state: session.state(),
        turns,
        pending_input: session.pending_input().to_string(),
        created_at: session.created_at().to_rfc3339(),
    }))
}

async fn set_input_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<InputRequest>,
) -> Result<StatusCode, ApiError> {
    let handle = state.session(&id).await?;
    let mut session = handle.try_lock().map_err(|_| busy(&id))?;
    session.set_input(payload.text);
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    submit(&state, &id, None).await
}

async fn message_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> Result<Response, ApiError> {
    submit(&state, &id, Some(payload.message)).await
}

/// Shared by `submit` and `messages`. The session lock is taken with
/// `try_lock`, so a second submission during `Processing` gets 409.
async fn submit(
    state: &ApiV1State,
    id: &str,
    input: Option<String>,
) -> Result<Response, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.try_lock().map_err(|_| busy(id))?;

    if let Some(text) = input {
        session.set_input(text);
    }

    info!(session = %id, input_len = session.pending_input().len(), "v1/submit request");

    match session.submit(&state.pipeline).await {
        Ok(SubmitOutcome::Answered { .. }) => Ok(Json(TranscriptResponse {
            turns: session.turns().to_vec(),
        })
        .into_response()),
        Ok(SubmitOutcome::Ignored) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            warn!(session = %id, error = %e, "Submission failed");
            Err((status_for(&e), Json(e.into())))
        }
    }
}

async fn delete_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    if sessions.remove(&id).is_some() {
        info!(session = %id, "Session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, SessionError::NotFound(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use dermachat_config::{AppConfig, ContextSourceKind};
    use dermachat_core::context::TRATAMIENTO_PLACEHOLDER;
    use dermachat_core::error::ProviderError;
    use dermachat_core::message::Role;
    use dermachat_core::provider::{Embedder, Generator, PassageRetriever, RetrievalQuery};
    use dermachat_providers::Services;

    #[test]
    fn every_error_maps_to_a_client_visible_status() {
        let upstream = Error::from(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
        assert_eq!(status_for(&upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&SessionError::Busy("s".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&SessionError::NotFound("s".into()).into()),
            StatusCode::NOT_FOUND
        );
    }

    /// Lightweight mock backends for gateway tests.
    struct MockEmbedder {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Embedder for MockEmbedder {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            if self.fail {
                Err(ProviderError::Network("embedding service unreachable".into()))
            } else {
                Ok(vec![0.1, 0.2, 0.3])
            }
        }
    }

    struct MockRetriever;

    #[async_trait::async_trait]
    impl PassageRetriever for MockRetriever {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn retrieve(&self, _query: &RetrievalQuery) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["pasaje".into()])
        }
    }

    struct MockGenerator {
        delay_ms: u64,
    }

    #[async_trait::async_trait]
    impl Generator for MockGenerator {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            Ok("Respuesta simulada".into())
        }
    }

    fn state_with(config: AppConfig, fail_embedding: bool, delay_ms: u64) -> SharedApiState {
        let pipeline = RagPipeline::new(Services {
            embedder: Arc::new(MockEmbedder {
                fail: fail_embedding,
            }),
            retriever: Arc::new(MockRetriever),
            generator: Arc::new(MockGenerator { delay_ms }),
        });
        Arc::new(ApiV1State::new(
            pipeline,
            config,
            dermachat_providers::http_client(5),
        ))
    }

    fn test_api_state() -> SharedApiState {
        state_with(AppConfig::default(), false, 0)
    }

    async fn create_session(state: &SharedApiState, query: &str) -> SessionCreatedResponse {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/sessions{query}"))
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_message(id: &str, message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/sessions/{id}/messages"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn create_session_resolves_query_context() {
        let state = test_api_state();
        let created = create_session(&state, "?formulario=leve").await;

        assert_eq!(created.state, SessionState::Empty);
        assert_eq!(created.context.formulario, "leve");
        assert_eq!(created.context.tratamiento, TRATAMIENTO_PLACEHOLDER);
        assert!(created.warnings.is_empty());
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn static_strategy_ignores_request_query() {
        let mut config = AppConfig::default();
        config.context.source = ContextSourceKind::Static;
        config.context.fixed.formulario = Some("fijo".into());
        let state = state_with(config, false, 0);

        let created = create_session(&state, "?formulario=otro").await;
        assert_eq!(created.context.formulario, "fijo");
    }

    #[tokio::test]
    async fn get_session_renders_and_leaves_empty() {
        let state = test_api_state();
        let created = create_session(&state, "").await;

        let req = Request::builder()
            .uri(format!("/sessions/{}", created.id))
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let detail: SessionDetailResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail.state, SessionState::AwaitingInput);
        assert!(detail.turns.is_empty());
    }

    #[tokio::test]
    async fn get_session_not_found() {
        let req = Request::builder()
            .uri("/sessions/nonexistent-id")
            .body(Body::empty())
            .unwrap();
        let response = v1_router(test_api_state()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn message_appends_two_turns() {
        let state = test_api_state();
        let created = create_session(&state, "").await;

        let response = v1_router(state.clone())
            .oneshot(post_message(&created.id, "¿Es compatible con la lactancia?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let transcript: TranscriptResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(transcript.turns.len(), 2);
        assert_eq!(transcript.turns[0].role(), Role::User);
        assert_eq!(transcript.turns[0].content(), "¿Es compatible con la lactancia?");
        assert_eq!(transcript.turns[1].role(), Role::Assistant);
        assert_eq!(transcript.turns[1].content(), "Respuesta simulada");
    }

    #[tokio::test]
    async fn blank_message_is_no_content() {
        let state = test_api_state();
        let created = create_session(&state, "").await;

        let response = v1_router(state.clone())
            .oneshot(post_message(&created.id, "   "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let handle = state.session(&created.id).await.unwrap();
        assert!(handle.lock().await.turns().is_empty());
    }

    #[tokio::test]
    async fn set_input_then_submit() {
        let state = test_api_state();
        let created = create_session(&state, "").await;

        let req = Request::builder()
            .method("PUT")
            .uri(format!("/sessions/{}/input", created.id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text":"¿Dosis de inicio?"}"#))
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let req = Request::builder()
            .method("POST")
            .uri(format!("/sessions/{}/submit", created.id))
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let handle = state.session(&created.id).await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.turns()[0].content(), "¿Dosis de inicio?");
        assert_eq!(session.pending_input(), "");
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let state = state_with(AppConfig::default(), true, 0);
        let created = create_session(&state, "").await;

        let response = v1_router(state.clone())
            .oneshot(post_message(&created.id, "pregunta"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.contains("embedding service unreachable"));

        let handle = state.session(&created.id).await.unwrap();
        let session = handle.lock().await;
        assert!(session.turns().is_empty());
        assert_eq!(session.pending_input(), "pregunta");
    }

    #[tokio::test]
    async fn concurrent_submission_is_conflict() {
        let state = state_with(AppConfig::default(), false, 300);
        let created = create_session(&state, "").await;

        let first = tokio::spawn({
            let state = state.clone();
            let id = created.id.clone();
            async move { v1_router(state).oneshot(post_message(&id, "primera")).await.unwrap() }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let second = v1_router(state.clone())
            .oneshot(post_message(&created.id, "segunda"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let first = first.await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let handle = state.session(&created.id).await.unwrap();
        assert_eq!(handle.lock().await.turns().len(), 2);
    }

    #[tokio::test]
    async fn oldest_session_is_evicted() {
        let mut config = AppConfig::default();
        config.gateway.max_sessions = 2;
        let state = state_with(config, false, 0);

        let first = create_session(&state, "").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = create_session(&state, "").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let third = create_session(&state, "").await;

        let sessions = state.sessions.read().await;
        assert_eq!(sessions.len(), 2);
        assert!(!sessions.contains_key(&first.id));
        assert!(sessions.contains_key(&second.id));
        assert!(sessions.contains_key(&third.id));
    }

    #[tokio::test]
    async fn delete_session() {
        let state = test_api_state();
        let created = create_session(&state, "").await;

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/sessions/{}", created.id))
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.sessions.read().await.is_empty());

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/sessions/{}", created.id))
            .body(Body::empty())
            .unwrap();
        let response = v1_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
