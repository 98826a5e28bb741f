use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file selected")]
    NoFile,
    #[error("File type not allowed: {0}")]
    ExtensionNotAllowed(String),
    #[error("{0}")]
    UnknownKind(String),
    #[error("Invalid upload: {0}")]
    Multipart(String),
    #[error("File not found")]
    NotFound,
    #[error("Internal error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile
            | ApiError::ExtensionNotAllowed(_)
            | ApiError::UnknownKind(_)
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
