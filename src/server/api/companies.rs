use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{change_diff, record};
use crate::server::AppState;
use crate::server::dto::{CompanyPayload, SearchParams};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, Company, NewActivity};

pub async fn create_company(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Company name is required"));
    }

    let now = Utc::now();
    let mut company = Company {
        id: 0,
        name: req.name,
        website: req.website,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    company.id = state.store.create_company(&company)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Company",
            entity_id: Some(company.id),
            summary: format!("Created company \"{}\"", company.name),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(company))))
}

pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let companies = state.store.list_companies(params.q.as_deref())?;
    Ok(Json(ApiResponse::success(companies)))
}

pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state.store.get_company(id)?.or_not_found("Company not found")?;
    Ok(Json(ApiResponse::success(company)))
}

pub async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Company name is required"));
    }

    let existing = state.store.get_company(id)?.or_not_found("Company not found")?;

    let company = Company {
        id,
        name: req.name,
        website: req.website,
        notes: req.notes,
        updated_at: Utc::now(),
        ..existing.clone()
    };
    state.store.update_company(&company)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Company",
            entity_id: Some(id),
            summary: format!("Updated company \"{}\"", company.name),
            changes: change_diff(&existing, &company),
        },
    );

    Ok(Json(ApiResponse::success(company)))
}

pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state.store.get_company(id)?.or_not_found("Company not found")?;
    state.store.delete_company(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Company",
            entity_id: Some(id),
            summary: format!("Deleted company \"{}\"", company.name),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
