//! REST API types.
//!
//! Both the synchronous upload response and the logs of queued imports use
//! the same result shape: `{message, successCount, errorCount, errors}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ImportError, QueueError, StoreError, UploadError};
use crate::models::{BatchItemError, BatchResult, CandidateRecord, Violation};

/// Message returned with every completed synchronous import.
pub const PROCESSING_COMPLETED: &str = "Processing completed";

/// Response to a synchronous upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ItemError>,
}

/// One rejected row.
#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub item: CandidateRecord,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

impl From<BatchItemError> for ItemError {
    fn from(err: BatchItemError) -> Self {
        ItemError {
            item: err.item,
            error: err.reason,
            violations: err.violations,
        }
    }
}

impl From<BatchResult> for UploadResponse {
    fn from(result: BatchResult) -> Self {
        UploadResponse {
            message: PROCESSING_COMPLETED.to_string(),
            success_count: result.success_count,
            error_count: result.error_count,
            errors: result.errors.into_iter().map(ItemError::from).collect(),
        }
    }
}

/// Response to an upload handed to the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    pub message: String,
    pub job_id: Uuid,
    pub filename: String,
}

/// A file received from a client, before it is imported.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Reject empty files, anything not named `*.csv`, and files over `max_bytes`.
    pub fn check(&self, max_bytes: usize) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        let name = self.filename.as_deref().unwrap_or("");
        if !name.to_lowercase().ends_with(".csv") {
            return Err(UploadError::InvalidFileType {
                received: if name.is_empty() { "unknown".to_string() } else { name.to_string() },
            });
        }

        if self.bytes.len() > max_bytes {
            return Err(UploadError::FileTooLarge { max_bytes });
        }

        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("unknown")
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Everything an HTTP handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Storage error");
                "Internal server error".to_string()
            }
            other => {
                tracing::warn!(status = status.as_u16(), error = %other, "Request rejected");
                other.to_string()
            }
        };

        (status, Json(error_response(&message, status))).into_response()
    }
}

/// Create an error response body
pub fn error_response(message: &str, status: StatusCode) -> Value {
    json!({
        "message": message,
        "status": status.as_u16(),
    })
}
