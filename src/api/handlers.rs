use crate::api::error::ApiError;
use crate::api::AppState;
use crate::domain::model::{DocumentRecord, DocumentView, Keyword, UploadedFile};
use crate::utils::error::DocError;
use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

/// `POST /api/upload`: every multipart part carrying a filename is a document.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<DocumentView>>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            // 一般表單欄位，略過
            tracing::debug!("Skipping form field {:?}", field.name());
            continue;
        };
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;

        files.push(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    tracing::info!("📤 Upload with {} file(s)", files.len());
    let views = state.service.ingest_all(files).await?;
    Ok(Json(views))
}

/// `GET /api/files`
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

/// `GET /api/files/{id}`
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DocumentView>, ApiError> {
    Ok(Json(state.service.get(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct KeywordRequest {
    pub text: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct KeywordResponse {
    pub keywords: Vec<Keyword>,
}

/// `POST /api/keywords`: tags arbitrary text with the loaded model.
pub async fn extract_keywords(
    State(state): State<AppState>,
    Json(request): Json<KeywordRequest>,
) -> Result<Json<KeywordResponse>, ApiError> {
    let tagger = state.service.tagger().cloned().ok_or(DocError::ModelUnavailable)?;

    let keywords = tokio::task::spawn_blocking(move || match request.top_n {
        Some(top_n) => tagger.extract_keywords_top(&request.text, top_n),
        None => tagger.extract_keywords(&request.text),
    })
    .await
    .map_err(|e| DocError::EmbeddingError {
        message: format!("keyword task failed: {}", e),
    })??;

    Ok(Json(KeywordResponse { keywords }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents: usize,
    pub keywords_enabled: bool,
    pub supported_extensions: Vec<&'static str>,
    pub uptime_secs: u64,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        documents: state.service.count().await,
        keywords_enabled: state.service.tagger().is_some(),
        supported_extensions: state.service.supported_extensions(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn banner() -> &'static str {
    "doc-tagger is running. POST documents to /api/upload"
}
