use crate::utils::error::DocError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// HTTP status plus a message rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(StatusCode::BAD_REQUEST, message.into())
    }
}

pub fn status_for(error: &DocError) -> StatusCode {
    match error {
        DocError::InvalidRequest { .. } | DocError::MissingFileField => StatusCode::BAD_REQUEST,
        DocError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DocError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DocError::ExtractionError { .. } | DocError::ZipError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DocError::NotFound { .. } => StatusCode::NOT_FOUND,
        DocError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DocError> for ApiError {
    fn from(error: DocError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                error,
                error.category(),
                error.severity()
            );
            ApiError(status, error.user_friendly_message())
        } else {
            tracing::warn!("⚠️ Rejected request: {}", error);
            ApiError(status, error.to_string())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        ApiError(error.status(), error.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}
