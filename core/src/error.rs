//! Error types for the task API client.
//!
//! # Design
//! The server reports four kinds of failure and each gets its own variant:
//! 400 carries the per-field details, 404 and 409 are distinguished so a
//! caller can tell "gone" from "retry with different data". Any other
//! unexpected status lands in `HttpError` with the raw body for debugging.

use thiserror::Error;

use crate::types::FieldError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the request payload or query (400).
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    /// The task or page does not exist (404).
    #[error("resource not found")]
    NotFound,

    /// A pending task with the same title already exists (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}
