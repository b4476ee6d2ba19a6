use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{CalendarItem, CalendarParams};
use crate::server::response::{ApiError, ApiResponse};

/// Merges scheduled events and the due dates of open tasks into a single
/// feed for a date range. Both bounds are optional.
pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> Result<impl IntoResponse, ApiError> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if to < from {
            return Err(ApiError::bad_request("Range end is before range start"));
        }
    }

    let events = state
        .store
        .list_events_between(params.from.as_ref(), params.to.as_ref())?;
    let tasks = state
        .store
        .list_open_tasks_due_between(params.from.as_ref(), params.to.as_ref())?;

    let mut items: Vec<CalendarItem> = events
        .into_iter()
        .map(|e| CalendarItem {
            id: format!("event-{}", e.id),
            kind: "event",
            title: e.title,
            start: e.start,
            end: e.end,
            all_day: e.all_day,
            project_id: e.project_id,
        })
        .collect();

    items.extend(tasks.into_iter().filter_map(|t| {
        let due = t.due_date?;
        Some(CalendarItem {
            id: format!("task-{}", t.id),
            kind: "task",
            title: t.title,
            start: due,
            end: None,
            all_day: true,
            project_id: Some(t.project_id),
        })
    }));

    items.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    Ok(Json(ApiResponse::success(items)))
}
