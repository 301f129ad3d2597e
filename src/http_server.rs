//! HTTP API for the browser front end
//!
//! Thin axum layer over [`Session`]. Every handler maps one session operation;
//! errors come back as `{"error": "..."}` with a status matching the failure.

use crate::error::FolioError;
use crate::models::{Document, Note, User};
use crate::session::Session;
use crate::settings::ApiKeyStatus;
use crate::summary::SummaryAvailability;
use crate::sync::SyncReport;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

/// Largest PDF accepted by the upload endpoint.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session, start_time: Instant::now() }
    }
}

// ============================================================================
// Error type
// ============================================================================

pub struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<FolioError> for AppError {
    fn from(e: FolioError) -> Self {
        let status = match &e {
            FolioError::EmptyNote
            | FolioError::InvalidPage { .. }
            | FolioError::NotPdf(_)
            | FolioError::NotRemote(_) => StatusCode::BAD_REQUEST,
            FolioError::DocumentNotFound(_)
            | FolioError::NoteNotFound(_)
            | FolioError::NoSelection
            | FolioError::NoExtractedText(_) => StatusCode::NOT_FOUND,
            FolioError::DuplicateId(_)
            | FolioError::SyncAlreadyRunning
            | FolioError::ShareAlreadyRunning(_) => StatusCode::CONFLICT,
            FolioError::NotSignedIn | FolioError::AuthFailed(_) | FolioError::PopupBlocked => {
                StatusCode::UNAUTHORIZED
            }
            FolioError::MissingCredential => StatusCode::PRECONDITION_FAILED,
            FolioError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FolioError::Network(_)
            | FolioError::SyncFailed(_)
            | FolioError::UploadFailed(_)
            | FolioError::ShareFailed(_)
            | FolioError::DownloadFailed(_)
            | FolioError::SummaryFailed(_) => StatusCode::BAD_GATEWAY,
            FolioError::Settings(_) | FolioError::StatePoisoned | FolioError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("{}", e);
        }
        AppError(status, e.to_string())
    }
}

type ApiResult<T> = Result<T, AppError>;

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
    signed_in: bool,
    uptime_secs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentsResponse {
    documents: Vec<Document>,
    selected_id: Option<String>,
    is_syncing: bool,
}

#[derive(Deserialize)]
struct UploadQuery {
    name: Option<String>,
}

#[derive(Deserialize)]
struct SummaryRequest {
    summary: String,
}

#[derive(Serialize)]
struct SummaryStatusResponse {
    status: SummaryAvailability,
}

#[derive(Deserialize)]
struct NoteRequest {
    content: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

#[derive(Serialize)]
struct TextResponse {
    text: String,
}

#[derive(Serialize)]
struct ShareResponse {
    link: String,
}

#[derive(Deserialize)]
struct ApiKeyRequest {
    key: String,
}

fn document_json(doc: &Arc<Document>) -> Json<Document> {
    Json(Document::clone(doc))
}

// ============================================================================
// Handlers
// ============================================================================

// GET /health
async fn health_handler(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let documents = state.session.documents()?.len();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents,
        signed_in: state.session.current_user().is_some(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

// GET /me
async fn me_handler(State(state): State<AppState>) -> Json<Option<User>> {
    Json(state.session.current_user())
}

// POST /auth/sign-in
async fn sign_in_handler(State(state): State<AppState>) -> ApiResult<Json<User>> {
    Ok(Json(state.session.sign_in().await?))
}

// POST /auth/sign-out
async fn sign_out_handler(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.session.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /documents
async fn list_documents_handler(State(state): State<AppState>) -> ApiResult<Json<DocumentsResponse>> {
    let documents = state.session.documents()?;
    Ok(Json(DocumentsResponse {
        documents: documents.iter().map(|d| Document::clone(d)).collect(),
        selected_id: state.session.selected_id()?,
        is_syncing: state.session.is_syncing(),
    }))
}

// POST /documents?name=paper.pdf  (body: raw PDF)
async fn upload_handler(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "document.pdf".to_string());
    let document = state.session.upload(&name, body.to_vec()).await?;
    tracing::info!("[POST /documents] {} ({})", document.name, document.origin.as_str());
    Ok((StatusCode::CREATED, document_json(&document)))
}

// GET /documents/selected
async fn selected_handler(State(state): State<AppState>) -> ApiResult<Json<Document>> {
    let document = state.session.selected_document()?.ok_or(FolioError::NoSelection)?;
    Ok(document_json(&document))
}

// GET /documents/{id}
async fn get_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(document_json(&state.session.get(&id)?))
}

// POST /documents/{id}/select
async fn select_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(document_json(&state.session.select(&id)?))
}

// GET /documents/{id}/content
async fn content_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.session.load_content(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response())
}

// POST /documents/{id}/extract
async fn extract_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TextResponse>> {
    let text = state.session.extract_text(&id).await?;
    Ok(Json(TextResponse { text }))
}

// GET /documents/{id}/text
async fn text_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TextResponse>> {
    state.session.get(&id)?;
    let text = state
        .session
        .extracted_text(&id)
        .ok_or(FolioError::NoExtractedText(id))?;
    Ok(Json(TextResponse { text }))
}

// PUT /documents/{id}/summary
async fn set_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SummaryRequest>,
) -> ApiResult<Json<Document>> {
    Ok(document_json(&state.session.set_summary(&id, &req.summary)?))
}

// POST /documents/{id}/summary/generate
async fn generate_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    Ok(document_json(&state.session.generate_summary(&id).await?))
}

// GET /documents/{id}/summary/status
async fn summary_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SummaryStatusResponse>> {
    let status = state.session.summary_availability(&id)?;
    Ok(Json(SummaryStatusResponse { status }))
}

// POST /documents/{id}/notes
async fn add_note_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let note = state.session.add_note(&id, &req.content)?;
    Ok((StatusCode::CREATED, Json(note)))
}

// PUT /documents/{id}/notes/{note_id}
async fn update_note_handler(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(String, String)>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<Note>> {
    Ok(Json(state.session.update_note(&id, &note_id, &req.content)?))
}

// DELETE /documents/{id}/notes/{note_id}
async fn delete_note_handler(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.session.delete_note(&id, &note_id)?;
    Ok(Json(DeleteResponse { deleted }))
}

// POST /documents/{id}/share
async fn share_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareResponse>> {
    let link = state.session.share(&id).await?;
    Ok(Json(ShareResponse { link }))
}

// POST /sync
async fn sync_handler(State(state): State<AppState>) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.session.sync().await?))
}

// GET /settings/api-key
async fn api_key_status_handler(State(state): State<AppState>) -> Json<ApiKeyStatus> {
    Json(state.session.api_key_status())
}

// PUT /settings/api-key
async fn save_api_key_handler(
    State(state): State<AppState>,
    Json(req): Json<ApiKeyRequest>,
) -> ApiResult<Json<ApiKeyStatus>> {
    if req.key.trim().is_empty() {
        return Err(AppError(StatusCode::BAD_REQUEST, "API key is empty".to_string()));
    }
    Ok(Json(state.session.set_api_key(&req.key)?))
}

// DELETE /settings/api-key
async fn clear_api_key_handler(State(state): State<AppState>) -> ApiResult<Json<ApiKeyStatus>> {
    Ok(Json(state.session.clear_api_key()?))
}

// ============================================================================
// Router
// ============================================================================

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "{} {}",
        method,
        uri
    );
    response
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/me", get(me_handler))
        .route("/auth/sign-in", post(sign_in_handler))
        .route("/auth/sign-out", post(sign_out_handler))
        .route("/documents", get(list_documents_handler).post(upload_handler))
        .route("/documents/selected", get(selected_handler))
        .route("/documents/{id}", get(get_document_handler))
        .route("/documents/{id}/select", post(select_handler))
        .route("/documents/{id}/content", get(content_handler))
        .route("/documents/{id}/extract", post(extract_handler))
        .route("/documents/{id}/text", get(text_handler))
        .route("/documents/{id}/summary", put(set_summary_handler))
        .route("/documents/{id}/summary/generate", post(generate_summary_handler))
        .route("/documents/{id}/summary/status", get(summary_status_handler))
        .route("/documents/{id}/notes", post(add_note_handler))
        .route(
            "/documents/{id}/notes/{note_id}",
            put(update_note_handler).delete(delete_note_handler),
        )
        .route("/documents/{id}/share", post(share_handler))
        .route("/sync", post(sync_handler))
        .route(
            "/settings/api-key",
            get(api_key_status_handler)
                .put(save_api_key_handler)
                .delete(clear_api_key_handler),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}
