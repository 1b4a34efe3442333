//! Stateless HTTP request builder and response parser for the task API.
//!
//! # Design
//! `TaskClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTask, Envelope, ErrorBody, Task, TaskPage, UpdateTask};

/// Synchronous, stateless client for the task API.
#[derive(Debug, Clone)]
pub struct TaskClient {
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `page` and `limit` are only sent when given; the server defaults them
    /// to 1 and 10.
    pub fn build_list_tasks(&self, page: Option<u32>, limit: Option<u32>) -> HttpRequest {
        let query: Vec<String> = [("page", page), ("limit", limit)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| format!("{name}={v}")))
            .collect();
        let mut path = format!("{}/tasks", self.base_url);
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }
        get_request(path)
    }

    pub fn build_get_task(&self, id: Uuid) -> HttpRequest {
        get_request(self.task_path(id))
    }

    pub fn build_create_task(&self, input: &CreateTask) -> Result<HttpRequest, ApiError> {
        json_request(HttpMethod::Post, format!("{}/tasks", self.base_url), input)
    }

    pub fn build_update_task(&self, id: Uuid, input: &UpdateTask) -> Result<HttpRequest, ApiError> {
        json_request(HttpMethod::Patch, self.task_path(id), input)
    }

    pub fn build_delete_task(&self, id: Uuid) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.task_path(id),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_list_tasks(&self, response: HttpResponse) -> Result<TaskPage, ApiError> {
        check_status(&response, 200)?;
        decode(&response.body)
    }

    pub fn parse_get_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response, 200)?;
        decode::<Envelope<Task>>(&response.body).map(|e| e.data)
    }

    pub fn parse_create_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response, 201)?;
        decode::<Envelope<Task>>(&response.body).map(|e| e.data)
    }

    pub fn parse_update_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response, 200)?;
        decode::<Envelope<Task>>(&response.body).map(|e| e.data)
    }

    /// Returns the task as it was before deletion.
    pub fn parse_delete_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        check_status(&response, 200)?;
        decode::<Envelope<Task>>(&response.body).map(|e| e.data)
    }

    fn task_path(&self, id: Uuid) -> String {
        format!("{}/tasks/{id}", self.base_url)
    }
}

fn get_request(path: String) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Get,
        path,
        headers: Vec::new(),
        body: None,
    }
}

fn json_request<T: serde::Serialize>(
    method: HttpMethod,
    path: String,
    input: &T,
) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    Ok(HttpRequest {
        method,
        path,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    match response.status {
        400 => {
            let body: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
            Err(ApiError::Validation {
                message: body.error.or(body.message).unwrap_or_else(|| "Bad Request".to_string()),
                details: body.details,
            })
        }
        404 => Err(ApiError::NotFound),
        409 => {
            let body: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
            Err(ApiError::Conflict(
                body.message.or(body.error).unwrap_or_else(|| "Conflict".to_string()),
            ))
        }
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}
