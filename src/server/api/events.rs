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
use crate::server::dto::EventPayload;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, Event, NewActivity};

fn validate(req: &EventPayload) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Event title is required"));
    }
    if let Some(end) = req.end {
        if end < req.start {
            return Err(ApiError::bad_request("Event cannot end before it starts"));
        }
    }
    Ok(())
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;

    let now = Utc::now();
    let mut event = Event {
        id: 0,
        title: req.title,
        start: req.start,
        end: req.end,
        all_day: req.all_day,
        project_id: req.project_id,
        contact_id: req.contact_id,
        location: req.location,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    event.id = state.store.create_event(&event)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Event",
            entity_id: Some(event.id),
            summary: format!("Scheduled \"{}\"", event.title),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.store.list_events()?;
    Ok(Json(ApiResponse::success(events)))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.store.get_event(id)?.or_not_found("Event not found")?;
    Ok(Json(ApiResponse::success(event)))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<EventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;
    let existing = state.store.get_event(id)?.or_not_found("Event not found")?;

    let event = Event {
        id,
        title: req.title,
        start: req.start,
        end: req.end,
        all_day: req.all_day,
        project_id: req.project_id,
        contact_id: req.contact_id,
        location: req.location,
        notes: req.notes,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_event(&event)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Event",
            entity_id: Some(id),
            summary: format!("Updated event \"{}\"", event.title),
            changes: change_diff(&existing, &event),
        },
    );

    Ok(Json(ApiResponse::success(event)))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.store.get_event(id)?.or_not_found("Event not found")?;
    state.store.delete_event(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Event",
            entity_id: Some(id),
            summary: format!("Deleted event \"{}\"", event.title),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
