//! Error type returned by every request handler.
//!
//! Each failure is one of four kinds: validation (400), not found (404),
//! conflict (409) or store failure (500). Store errors are logged in full
//! here and reach the client only as a generic message plus an optional
//! SQLite error code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::schema::FieldError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}")]
    Validation {
        error: &'static str,
        details: Vec<FieldError>,
    },

    #[error("task id is required")]
    MissingId,

    #[error("task not found")]
    NotFound,

    #[error("page {current_page} not found, {total_pages} pages available")]
    PageNotFound { current_page: u32, total_pages: u64 },

    #[error("a pending task titled {title:?} already exists")]
    Conflict { title: String },

    #[error(transparent)]
    Store(StoreError),
}

impl ApiError {
    pub fn invalid_body(details: Vec<FieldError>) -> Self {
        ApiError::Validation {
            error: "Invalid request body",
            details,
        }
    }

    pub fn invalid_query(details: Vec<FieldError>) -> Self {
        ApiError::Validation {
            error: "Invalid query parameters",
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::MissingId => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::PageNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::DuplicatePending { title } => ApiError::Conflict { title },
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation { error, details } => json!({
                "error": error,
                "details": details,
            }),
            ApiError::MissingId => json!({ "error": "Task ID is required" }),
            ApiError::NotFound => json!({
                "error": "Not Found",
                "message": "No task found with the provided ID",
            }),
            ApiError::PageNotFound {
                current_page,
                total_pages,
            } => json!({
                "error": "Page not found",
                "currentPage": current_page,
                "totalPages": total_pages,
            }),
            ApiError::Conflict { title } => json!({
                "error": "Conflict",
                "message": format!("A pending task titled '{title}' already exists"),
            }),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "task store failure");
                match err.code() {
                    Some(code) => json!({ "error": "Internal Server Error", "code": code }),
                    None => json!({ "error": "Internal Server Error" }),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
