//! HTTP handlers for the `/tasks` resource.
//!
//! Every handler validates its input completely before touching the store,
//! then maps store failures into [`ApiError`].

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::{self, FieldError};
use crate::task::Task;
use crate::AppState;

/// Raw pagination query. Values stay strings until [`schema::validate_pagination`]
/// coerces them.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub meta: PageMeta,
    pub data: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub data: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTask {
    pub message: String,
    pub data: Task,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/", patch(missing_id).delete(missing_id))
        .route("/tasks/{id}", get(get_task).patch(update_task).delete(delete_task))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::MissingId);
    }
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation {
        error: "Invalid task ID",
        details: vec![FieldError::new("id", "Invalid uuid")],
    })
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_body(vec![FieldError::root(rejection.body_text())]))
}

async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<TaskPage>, ApiError> {
    let Query(query) = query
        .map_err(|rejection| ApiError::invalid_query(vec![FieldError::root(rejection.body_text())]))?;
    let pagination = schema::validate_pagination(query.page.as_deref(), query.limit.as_deref())
        .map_err(ApiError::invalid_query)?;

    let (total_items, data) = state
        .store
        .list_page(pagination.offset(), pagination.limit)
        .await?;

    let total_pages = pagination.total_pages(total_items);
    if pagination.is_out_of_range(total_pages) {
        return Err(ApiError::PageNotFound {
            current_page: pagination.page,
            total_pages,
        });
    }

    Ok(Json(TaskPage {
        meta: PageMeta {
            current_page: pagination.page,
            limit: pagination.limit,
            total_items,
            total_pages,
            has_next_page: u64::from(pagination.page) < total_pages,
        },
        data,
    }))
}

async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    let body = json_body(payload)?;
    let new_task = schema::validate_create(&body, Utc::now()).map_err(ApiError::invalid_body)?;

    let task = state.store.create(new_task).await.inspect_err(|err| {
        tracing::warn!(error = %err, "task creation failed");
    })?;
    tracing::info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(TaskEnvelope { data: task })))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let task = state.store.get(id).await?;
    Ok(Json(TaskEnvelope { data: task }))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let id = parse_id(&id)?;
    let body = json_body(payload)?;
    let changes = schema::validate_update(&body, Utc::now()).map_err(ApiError::invalid_body)?;

    let task = state.store.update(id, changes).await.inspect_err(|err| {
        tracing::warn!(task_id = %id, error = %err, "task update failed");
    })?;
    tracing::info!(task_id = %task.id, "task updated");
    Ok(Json(TaskEnvelope { data: task }))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedTask>, ApiError> {
    let id = parse_id(&id)?;
    let task = state.store.delete(id).await?;
    tracing::info!(task_id = %task.id, "task deleted");
    Ok(Json(DeletedTask {
        message: "Task deleted".to_string(),
        data: task,
    }))
}

async fn missing_id() -> ApiError {
    ApiError::MissingId
}
