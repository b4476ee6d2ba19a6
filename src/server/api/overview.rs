use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::OverviewResponse;
use crate::server::response::{ApiError, ApiResponse};

const RECENT_ACTIVITY_LIMIT: i64 = 10;

pub async fn get_overview(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = state.store.counts()?;
    let recent_activity = state.store.list_activity(RECENT_ACTIVITY_LIMIT, None)?;

    Ok(Json(ApiResponse::success(OverviewResponse {
        counts,
        recent_activity,
    })))
}
