use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{change_diff, parse_status, record};
use crate::server::AppState;
use crate::server::dto::{StatusRequest, TaskPayload};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, NewActivity, Task, TaskStatus};

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.store.get_task(id)?.or_not_found("Task not found")?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<TaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Task title is required"));
    }
    let existing = state.store.get_task(id)?.or_not_found("Task not found")?;

    let task = Task {
        id,
        project_id: existing.project_id,
        title: req.title,
        status: req.status,
        due_date: req.due_date,
        notes: req.notes,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_task(&task)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Task",
            entity_id: Some(id),
            summary: format!("Updated task \"{}\"", task.title),
            changes: change_diff(&existing, &task),
        },
    );

    Ok(Json(ApiResponse::success(task)))
}

pub async fn set_task_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: TaskStatus = parse_status(&req.status)?;
    let mut task = state.store.get_task(id)?.or_not_found("Task not found")?;

    let previous = task.status;
    task.status = status;
    task.updated_at = Utc::now();
    state.store.update_task(&task)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Status,
            entity_type: "Task",
            entity_id: Some(id),
            summary: format!(
                "Task \"{}\" moved from {} to {}",
                task.title, previous, status
            ),
            changes: None,
        },
    );

    Ok(Json(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.store.get_task(id)?.or_not_found("Task not found")?;
    state.store.delete_task(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Task",
            entity_id: Some(id),
            summary: format!("Deleted task \"{}\"", task.title),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
