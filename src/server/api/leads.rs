use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{change_diff, parse_status, record};
use crate::server::AppState;
use crate::server::dto::{LeadListParams, LeadPayload, StatusRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, Lead, LeadStatus, NewActivity};

fn lead_from_payload(id: i64, req: LeadPayload, created_at: chrono::DateTime<Utc>) -> Lead {
    Lead {
        id,
        title: req.title,
        status: req.status,
        source: req.source,
        value_estimate: req.value_estimate,
        company_id: req.company_id,
        contact_id: req.contact_id,
        next_step: req.next_step,
        due_date: req.due_date,
        notes: req.notes,
        created_at,
        updated_at: Utc::now(),
    }
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Lead title is required"));
    }

    let mut lead = lead_from_payload(0, req, Utc::now());
    lead.id = state.store.create_lead(&lead)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Lead",
            entity_id: Some(lead.id),
            summary: format!("Created lead \"{}\"", lead.title),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(lead))))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(parse_status::<LeadStatus>)
        .transpose()?;
    let leads = state.store.list_leads(status)?;
    Ok(Json(ApiResponse::success(leads)))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = state.store.get_lead(id)?.or_not_found("Lead not found")?;
    Ok(Json(ApiResponse::success(lead)))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<LeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.get_lead(id)?.or_not_found("Lead not found")?;

    let lead = lead_from_payload(id, req, existing.created_at);
    state.store.update_lead(&lead)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Lead",
            entity_id: Some(id),
            summary: format!("Updated lead \"{}\"", lead.title),
            changes: change_diff(&existing, &lead),
        },
    );

    Ok(Json(ApiResponse::success(lead)))
}

pub async fn set_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: LeadStatus = parse_status(&req.status)?;
    let mut lead = state.store.get_lead(id)?.or_not_found("Lead not found")?;

    let previous = lead.status;
    lead.status = status;
    lead.updated_at = Utc::now();
    state.store.update_lead(&lead)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Status,
            entity_type: "Lead",
            entity_id: Some(id),
            summary: format!(
                "Lead \"{}\" moved from {} to {}",
                lead.title, previous, status
            ),
            changes: None,
        },
    );

    Ok(Json(ApiResponse::success(lead)))
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = state.store.get_lead(id)?.or_not_found("Lead not found")?;
    state.store.delete_lead(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Lead",
            entity_id: Some(id),
            summary: format!("Deleted lead \"{}\"", lead.title),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
