//! HTTP API v1.
//!
//! Endpoints (all require the `x-session-id` header):
//!
//! - `POST /v1/chat`: Ask a question, get the answer
//! - `GET  /v1/history`: This session's conversation so far
//! - `GET  /v1/status`: This session's state and pipeline info

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use ragchat_chain::{ChatState, ControllerError};
use ragchat_core::history::HistoryEntry;

use crate::SharedState;
use crate::session::{SESSION_HEADER, is_valid_session_id};

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/history", get(history_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    history_len: usize,
}

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct StatusResponse {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    turns: usize,
    sessions: usize,
    documents: usize,
    model: String,
    uptime_secs: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<ControllerError> for ErrorResponse {
    fn from(e: ControllerError) -> Self {
        Self { error: e.to_string() }
    }
}

/// The session id from the request headers, or a 400.
fn session_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    let id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("missing {SESSION_HEADER} header")))?;
    if !is_valid_session_id(id) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("invalid {SESSION_HEADER} header"),
        ));
    }
    Ok(id)
}

fn status_for(e: &ControllerError) -> StatusCode {
    match e {
        ControllerError::EmptyQuestion => StatusCode::BAD_REQUEST,
        ControllerError::Busy => StatusCode::CONFLICT,
        ControllerError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = session_id(&headers)?;
    info!(session, question_len = payload.question.len(), "v1/chat request");

    // A started turn runs to completion even if the client goes away.
    let controller = state.sessions.open(session);
    let outcome = tokio::spawn(async move { controller.submit_turn(&payload.question).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Chat task failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "chat task failed")
        })?;

    match outcome {
        Ok(reply) => Ok(Json(ChatResponse {
            answer: reply.answer,
            history_len: reply.history_len,
        })),
        Err(e) => Err((status_for(&e), Json(e.into()))),
    }
}

async fn history_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = session_id(&headers)?;
    let entries = state
        .sessions
        .get(session)
        .map(|controller| controller.history())
        .unwrap_or_default();
    Ok(Json(HistoryResponse { entries }))
}

async fn status_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = session_id(&headers)?;
    let (chat_state, turns) = match state.sessions.get(session) {
        Some(controller) => (controller.state(), controller.turns()),
        None => (ChatState::Idle, 0),
    };
    Ok(Json(StatusResponse {
        state: chat_state.label(),
        error: chat_state.error_message().map(str::to_string),
        turns,
        sessions: state.sessions.len(),
        documents: state.documents,
        model: state.model.clone(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const PAGE: &str = "page-a";

    fn chat_request(question: &str) -> Request<Body> {
        chat_request_from(PAGE, question)
    }

    fn chat_request_from(session: &str, question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header(SESSION_HEADER, session)
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        get_from(PAGE, uri)
    }

    fn get_from(session: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(SESSION_HEADER, session)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_answers_from_context() {
        let app = v1_router(test_state());

        let response = app.oneshot(chat_request("What is Scrimba?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let answer = json["answer"].as_str().unwrap();
        assert!(answer.contains("Scrimba is an interactive coding platform."));
        assert_eq!(json["history_len"], 2);
    }

    #[tokio::test]
    async fn chat_then_history_lists_both_entries() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(chat_request("What is Scrimba?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = v1_router(state).oneshot(get("/history")).await.unwrap();
        let json = body_json(response).await;
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["role"], "user");
        assert_eq!(entries[0]["content"], "What is Scrimba?");
        assert_eq!(entries[1]["role"], "assistant");
        assert!(entries[1]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn empty_question_is_bad_request() {
        let response = v1_router(test_state())
            .oneshot(chat_request("   "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway_and_reported_in_status() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(chat_request("please explode"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("upstream exploded"));

        let response = v1_router(state.clone()).oneshot(get("/status")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["state"], "error");
        assert!(json["error"].as_str().unwrap().contains("upstream exploded"));
        assert_eq!(json["turns"], 0);

        let response = v1_router(state).oneshot(get("/history")).await.unwrap();
        let json = body_json(response).await;
        assert!(json["entries"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_reports_idle_pipeline() {
        let response = v1_router(test_state()).oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["state"], "idle");
        assert!(json.get("error").is_none());
        assert_eq!(json["turns"], 0);
        assert_eq!(json["sessions"], 0);
        assert_eq!(json["documents"], 1);
        assert_eq!(json["model"], "mock-model");
    }

    #[tokio::test]
    async fn fresh_page_does_not_see_another_pages_history() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(chat_request_from("page-a", "my secret is 42"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = v1_router(state.clone())
            .oneshot(get_from("page-b", "/history"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["entries"].as_array().unwrap().is_empty());

        let response = v1_router(state.clone())
            .oneshot(chat_request_from("page-b", "What is Scrimba?"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["history_len"], 2);

        let response = v1_router(state).oneshot(get_from("page-a", "/history")).await.unwrap();
        let json = body_json(response).await;
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["content"], "my secret is 42");
    }

    #[tokio::test]
    async fn busy_guard_is_per_session() {
        let (state, gate) = gated_state();
        let a = state.sessions.open("page-a");

        let pending = tokio::spawn({
            let a = a.clone();
            async move { a.submit("first").await }
        });
        while a.state() != ChatState::AwaitingResponse {
            tokio::task::yield_now().await;
        }

        let response = v1_router(state.clone())
            .oneshot(chat_request_from("page-a", "again"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let other = tokio::spawn(
            v1_router(state.clone()).oneshot(chat_request_from("page-b", "hello")),
        );
        while state.sessions.get("page-b").map(|c| c.state()) != Some(ChatState::AwaitingResponse) {
            tokio::task::yield_now().await;
        }

        gate.send(true).unwrap();
        let response = other.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["history_len"], 2);

        pending.await.unwrap().unwrap();
        assert_eq!(a.history_len(), 2);
        assert_eq!(state.sessions.len(), 2);
    }

    #[tokio::test]
    async fn missing_or_invalid_session_header_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"question":"hi"}"#))
            .unwrap();
        let response = v1_router(test_state()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains(SESSION_HEADER));

        let response = v1_router(test_state())
            .oneshot(get_from("not valid!", "/history"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .header(SESSION_HEADER, PAGE)
            .body(Body::from(r#"{"message":"wrong field"}"#))
            .unwrap();

        let response = v1_router(test_state()).oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn controller_errors_map_to_statuses() {
        assert_eq!(status_for(&ControllerError::Busy), StatusCode::CONFLICT);
        assert_eq!(status_for(&ControllerError::EmptyQuestion), StatusCode::BAD_REQUEST);
    }
}
