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
use crate::server::dto::{ProjectDetail, ProjectPayload, StatusRequest, TaskPayload};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, NewActivity, Project, ProjectStatus, Task};

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }

    let now = Utc::now();
    let mut project = Project {
        id: 0,
        name: req.name,
        status: req.status,
        company_id: req.company_id,
        contact_id: req.contact_id,
        start_date: req.start_date,
        end_date: req.end_date,
        budget: req.budget,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    project.id = state.store.create_project(&project)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Project",
            entity_id: Some(project.id),
            summary: format!("Created project \"{}\"", project.name),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.store.list_projects()?;
    Ok(Json(ApiResponse::success(projects)))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.store.get_project(id)?.or_not_found("Project not found")?;

    let detail = ProjectDetail {
        tasks: state.store.list_project_tasks(id)?,
        assets: state.store.list_project_assets(id)?,
        events: state.store.list_project_events(id)?,
        activity: state.store.list_entity_activity("Project", id, 50)?,
        project,
    };

    Ok(Json(ApiResponse::success(detail)))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.get_project(id)?.or_not_found("Project not found")?;

    let project = Project {
        id,
        name: req.name,
        status: req.status,
        company_id: req.company_id,
        contact_id: req.contact_id,
        start_date: req.start_date,
        end_date: req.end_date,
        budget: req.budget,
        notes: req.notes,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_project(&project)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Project",
            entity_id: Some(id),
            summary: format!("Updated project \"{}\"", project.name),
            changes: change_diff(&existing, &project),
        },
    );

    Ok(Json(ApiResponse::success(project)))
}

pub async fn set_project_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: ProjectStatus = parse_status(&req.status)?;
    let mut project = state.store.get_project(id)?.or_not_found("Project not found")?;

    let previous = project.status;
    project.status = status;
    project.updated_at = Utc::now();
    state.store.update_project(&project)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Status,
            entity_type: "Project",
            entity_id: Some(id),
            summary: format!(
                "Project \"{}\" moved from {} to {}",
                project.name, previous, status
            ),
            changes: None,
        },
    );

    Ok(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.store.get_project(id)?.or_not_found("Project not found")?;
    state.store.delete_project(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Project",
            entity_id: Some(id),
            summary: format!("Deleted project \"{}\"", project.name),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.get_project(id)?.or_not_found("Project not found")?;
    let tasks = state.store.list_project_tasks(id)?;
    Ok(Json(ApiResponse::success(tasks)))
}

pub async fn create_project_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<TaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Task title is required"));
    }
    let project = state.store.get_project(id)?.or_not_found("Project not found")?;

    let now = Utc::now();
    let mut task = Task {
        id: 0,
        project_id: id,
        title: req.title,
        status: req.status,
        due_date: req.due_date,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    task.id = state.store.create_task(&task)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Task",
            entity_id: Some(task.id),
            summary: format!("Added task \"{}\" to project \"{}\"", task.title, project.name),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(task))))
}
