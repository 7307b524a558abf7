//! JSON HTTP API over a single [`StudySession`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/status` | Whether a corpus is indexed, chunk count, document names |
//! | `POST` | `/documents` | Replace the corpus with the supplied documents |
//! | `POST` | `/ask` | Answer a question (`rag` or `baseline` mode) |
//! | `POST` | `/summary` | Summarize the corpus |
//! | `POST` | `/mcq` | Generate multiple-choice questions |
//! | `POST` | `/experiments` | Append an experiment note |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "not ready: no documents have been indexed" } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | invalid input (empty question, undecodable PDF, ...) |
//! | `not_ready` | 409 | no corpus indexed yet |
//! | `upstream_error` | 502 | embedding or generation service failure |
//! | `configuration` | 500 | inconsistent settings, e.g. embedding dimension change |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front-end
//! can call the API directly.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use study_copilot_core::error::CopilotError;
use study_copilot_core::models::{AnswerMode, AnswerResponse, McqSet, SourceDocument};

use crate::experiment::{params_in_order, Params};
use crate::extract::{clean_text, extract_text, MIME_PDF};
use crate::session::{AskOptions, IngestReport, SessionStatus, StudySession};

/// Uploaded PDFs arrive base64-encoded inside JSON.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const DEFAULT_MCQ_COUNT: usize = 5;

/// Build the API router. Exposed separately from [`run_server`] for tests.
pub fn router(session: Arc<StudySession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/documents", post(handle_documents))
        .route("/ask", post(handle_ask))
        .route("/summary", post(handle_summary))
        .route("/mcq", post(handle_mcq))
        .route("/experiments", post(handle_experiments))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(session)
}

/// Serve the API on `[server].bind` until the process is terminated.
pub async fn run_server(session: Arc<StudySession>) -> anyhow::Result<()> {
    let bind_addr = session.config().server.bind.clone();
    let app = router(session);

    println!("Study Copilot API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Converts into the JSON error envelope.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CopilotError> for AppError {
    fn from(err: CopilotError) -> Self {
        let status = match &err {
            CopilotError::InputValidation(_) => StatusCode::BAD_REQUEST,
            CopilotError::NotReady(_) => StatusCode::CONFLICT,
            CopilotError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            CopilotError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::warn!("request failed: {}", err);
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health, GET /status ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_status(State(session): State<Arc<StudySession>>) -> Json<SessionStatus> {
    Json(session.status())
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct DocumentUpload {
    name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    pdf_base64: Option<String>,
}

#[derive(Deserialize)]
struct DocumentsRequest {
    documents: Vec<DocumentUpload>,
    #[serde(default)]
    chunk_size: Option<usize>,
    #[serde(default)]
    chunk_overlap: Option<usize>,
}

async fn handle_documents(
    State(session): State<Arc<StudySession>>,
    Json(req): Json<DocumentsRequest>,
) -> Result<Json<IngestReport>, AppError> {
    let mut documents = Vec::with_capacity(req.documents.len());
    for upload in req.documents {
        let text = match (upload.text, upload.pdf_base64) {
            (Some(text), _) => text,
            (None, Some(encoded)) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| bad_request(format!("{}: invalid base64: {}", upload.name, e)))?;
                tokio::task::spawn_blocking(move || extract_text(&bytes, MIME_PDF))
                    .await
                    .map_err(|e| bad_request(format!("{}: extraction aborted: {}", upload.name, e)))?
                    .map_err(|e| bad_request(format!("{}: {}", upload.name, e)))?
            }
            (None, None) => {
                return Err(bad_request(format!(
                    "{}: one of text or pdf_base64 is required",
                    upload.name
                )))
            }
        };
        documents.push(SourceDocument {
            name: upload.name,
            text: clean_text(&text),
        });
    }

    let mut options = session.config().chunking.to_options();
    if let Some(size) = req.chunk_size {
        options.chunk_size = size;
    }
    if let Some(overlap) = req.chunk_overlap {
        options.chunk_overlap = overlap;
    }

    let report = session.ingest(documents, &options).await?;
    Ok(Json(report))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    mode: AnswerMode,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    temperature: Option<f32>,
}

async fn handle_ask(
    State(session): State<Arc<StudySession>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let options = AskOptions {
        mode: req.mode,
        top_k: req.top_k,
        temperature: req.temperature,
    };
    Ok(Json(session.ask(&req.question, &options).await?))
}

// ============ POST /summary ============

#[derive(Deserialize, Default)]
struct SummaryRequest {
    #[serde(default)]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn handle_summary(
    State(session): State<Arc<StudySession>>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = session.summarize(req.temperature).await?;
    Ok(Json(SummaryResponse { summary }))
}

// ============ POST /mcq ============

#[derive(Deserialize, Default)]
struct McqRequest {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    temperature: Option<f32>,
}

async fn handle_mcq(
    State(session): State<Arc<StudySession>>,
    Json(req): Json<McqRequest>,
) -> Result<Json<McqSet>, AppError> {
    let count = req.count.unwrap_or(DEFAULT_MCQ_COUNT);
    Ok(Json(session.mcqs(count, req.temperature).await?))
}

// ============ POST /experiments ============

#[derive(Deserialize)]
struct ExperimentRequest {
    title: String,
    #[serde(default, deserialize_with = "params_in_order")]
    parameters: Params,
    #[serde(default)]
    note: String,
}

#[derive(Serialize)]
struct ExperimentResponse {
    logged: bool,
}

async fn handle_experiments(
    State(session): State<Arc<StudySession>>,
    Json(req): Json<ExperimentRequest>,
) -> Result<Json<ExperimentResponse>, AppError> {
    if req.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    let logged = session.record_experiment(&req.title, &req.parameters, &req.note);
    Ok(Json(ExperimentResponse { logged }))
}
