use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{change_diff, record};
use crate::server::AppState;
use crate::server::dto::IdeaPayload;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, Idea, NewActivity};

pub async fn create_idea(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdeaPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Idea title is required"));
    }

    let now = Utc::now();
    let mut idea = Idea {
        id: 0,
        title: req.title,
        status: req.status,
        tags: req.tags,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    idea.id = state.store.create_idea(&idea)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Idea",
            entity_id: Some(idea.id),
            summary: format!("Created idea \"{}\"", idea.title),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(idea))))
}

pub async fn list_ideas(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let ideas = state.store.list_ideas()?;
    Ok(Json(ApiResponse::success(ideas)))
}

pub async fn get_idea(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let idea = state.store.get_idea(id)?.or_not_found("Idea not found")?;
    Ok(Json(ApiResponse::success(idea)))
}

pub async fn update_idea(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<IdeaPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.get_idea(id)?.or_not_found("Idea not found")?;

    let idea = Idea {
        id,
        title: req.title,
        status: req.status,
        tags: req.tags,
        notes: req.notes,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_idea(&idea)?;

    // A bare status move reads better in the feed as a status entry
    let only_status_changed = existing.status != idea.status
        && existing.title == idea.title
        && existing.tags == idea.tags
        && existing.notes == idea.notes;
    let entry = if only_status_changed {
        NewActivity {
            action: ActivityAction::Status,
            entity_type: "Idea",
            entity_id: Some(id),
            summary: format!(
                "Idea \"{}\" moved from {} to {}",
                idea.title, existing.status, idea.status
            ),
            changes: None,
        }
    } else {
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Idea",
            entity_id: Some(id),
            summary: format!("Updated idea \"{}\"", idea.title),
            changes: change_diff(&existing, &idea),
        }
    };
    record(state.store.as_ref(), entry);

    Ok(Json(ApiResponse::success(idea)))
}

pub async fn delete_idea(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let idea = state.store.get_idea(id)?.or_not_found("Idea not found")?;
    state.store.delete_idea(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Idea",
            entity_id: Some(id),
            summary: format!("Deleted idea \"{}\"", idea.title),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
