//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/answer`: answer a query for a session
//! - `GET  /v1/sessions/{id}/history`: a session's stored exchanges
//! - `POST /v1/knowledge/documents`: add a text document to the knowledge base

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use hybridrag_core::Error;
use hybridrag_core::error::KnowledgeError;
use hybridrag_core::memory::{ConversationMemory, Interaction, SessionId};
use hybridrag_core::source::SessionContext;
use hybridrag_knowledge::{KnowledgeBase, LoadOptions, LoadSummary};
use hybridrag_router::{QueryRouter, Response};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub router: Arc<QueryRouter>,
    pub memory: Arc<dyn ConversationMemory>,
    pub knowledge: Arc<KnowledgeBase>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/answer", post(answer_handler))
        .route("/sessions/{id}/history", get(history_handler))
        .route("/knowledge/documents", post(add_document_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    /// Omitted: a fresh session is created and returned in the response.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: SessionContext,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub interactions: Vec<Interaction>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub name: String,
    pub content: String,
    /// Replace chunks already stored under the same name.
    #[serde(default)]
    pub upsert: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddDocumentResponse {
    pub name: String,
    #[serde(flatten)]
    pub summary: LoadSummaryDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadSummaryDto {
    pub read: usize,
    pub skipped: usize,
    pub written: usize,
}

impl From<LoadSummary> for LoadSummaryDto {
    fn from(s: LoadSummary) -> Self {
        Self {
            read: s.read,
            skipped: s.skipped,
            written: s.written,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
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

/// Map a domain error onto an HTTP status.
fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        Error::Knowledge(KnowledgeError::Conflict(_)) => StatusCode::CONFLICT,
        Error::Provider(_) | Error::Search(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "Request failed");
    }
    api_error(status, e.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn answer_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<Response>, ApiError> {
    let session_id = payload
        .session_id
        .filter(|s| !s.trim().is_empty())
        .map(|s| SessionId::from(&s))
        .unwrap_or_default();
    info!(session = %session_id, "v1/answer request");

    state
        .router
        .answer(&payload.query, &session_id, &payload.context)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn history_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let interactions = state
        .memory
        .history(&id, params.limit)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(HistoryResponse {
        session_id: id,
        count: interactions.len(),
        interactions,
    }))
}

async fn add_document_handler(
    State(state): State<SharedApiState>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<AddDocumentResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "name is required"));
    }
    if req.content.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "content is empty"));
    }

    let options = LoadOptions {
        upsert: req.upsert,
        ..LoadOptions::default()
    };
    let summary = state
        .knowledge
        .load_text(&req.name, &req.content, options)
        .await
        .map_err(|e| error_response(e.into()))?;
    info!(name = %req.name, written = summary.written, "Document added");

    Ok((
        StatusCode::CREATED,
        Json(AddDocumentResponse {
            name: req.name,
            summary: summary.into(),
        }),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────
