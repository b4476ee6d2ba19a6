use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::ActivityParams;
use crate::server::response::{ApiError, ApiResponse};

const DEFAULT_FEED_LIMIT: i64 = 50;

/// Reverse-chronological activity feed, paged by passing the timestamp of
/// the last entry of the previous page as `before`.
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, 500);
    let entries = state.store.list_activity(limit, params.before.as_ref())?;
    Ok(Json(ApiResponse::success(entries)))
}
