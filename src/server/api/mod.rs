mod activity;
mod assets;
mod calendar;
mod companies;
mod contacts;
mod events;
mod ideas;
mod leads;
mod overview;
mod projects;
mod tasks;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    extract::multipart::MultipartError,
    routing::{delete, get, patch, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;
use super::response::ApiError;
use crate::store::Store;
use crate::types::NewActivity;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/overview", get(overview::get_overview))
        // Companies
        .route("/companies", get(companies::list_companies))
        .route("/companies", post(companies::create_company))
        .route("/companies/{id}", get(companies::get_company))
        .route("/companies/{id}", put(companies::update_company))
        .route("/companies/{id}", delete(companies::delete_company))
        // Contacts
        .route("/contacts", get(contacts::list_contacts))
        .route("/contacts", post(contacts::create_contact))
        .route("/contacts/import", post(contacts::import_contacts))
        .route("/contacts/{id}", get(contacts::get_contact))
        .route("/contacts/{id}", put(contacts::update_contact))
        .route("/contacts/{id}", delete(contacts::delete_contact))
        // Leads
        .route("/leads", get(leads::list_leads))
        .route("/leads", post(leads::create_lead))
        .route("/leads/{id}", get(leads::get_lead))
        .route("/leads/{id}", put(leads::update_lead))
        .route("/leads/{id}", delete(leads::delete_lead))
        .route("/leads/{id}/status", post(leads::set_lead_status))
        // Ideas
        .route("/ideas", get(ideas::list_ideas))
        .route("/ideas", post(ideas::create_idea))
        .route("/ideas/{id}", get(ideas::get_idea))
        .route("/ideas/{id}", put(ideas::update_idea))
        .route("/ideas/{id}", delete(ideas::delete_idea))
        // Projects and their tasks
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}", put(projects::update_project))
        .route("/projects/{id}", delete(projects::delete_project))
        .route("/projects/{id}/status", post(projects::set_project_status))
        .route("/projects/{id}/tasks", get(projects::list_project_tasks))
        .route("/projects/{id}/tasks", post(projects::create_project_task))
        // Tasks
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}", put(tasks::update_task))
        .route("/tasks/{id}", delete(tasks::delete_task))
        .route("/tasks/{id}/status", post(tasks::set_task_status))
        // Events and the merged calendar
        .route("/events", get(events::list_events))
        .route("/events", post(events::create_event))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}", put(events::update_event))
        .route("/events/{id}", delete(events::delete_event))
        .route("/calendar", get(calendar::get_calendar))
        // Assets
        .route("/assets", get(assets::list_assets))
        .route("/assets", post(assets::upload_assets))
        .route("/assets/{id}", get(assets::get_asset))
        .route("/assets/{id}", patch(assets::update_asset))
        .route("/assets/{id}", delete(assets::delete_asset))
        .route("/assets/{id}/download", get(assets::download_asset))
        // Activity feed
        .route("/activity", get(activity::list_activity))
}

/// Appends an activity entry, logging instead of failing: the primary
/// mutation has already committed and must not be rolled back by a
/// bookkeeping error.
pub(crate) fn record(store: &dyn Store, entry: NewActivity) {
    if let Err(e) = store.record_activity(&entry) {
        tracing::warn!(
            "Failed to record {} activity for {}: {}",
            entry.action,
            entry.entity_type,
            e
        );
    }
}

/// Field-level diff between two serialized snapshots of a record.
/// Bookkeeping columns are excluded; returns None when nothing changed.
pub(crate) fn change_diff<T: Serialize>(old: &T, new: &T) -> Option<Value> {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return None;
    };

    let mut diff = serde_json::Map::new();
    for (key, new_val) in &new {
        if matches!(key.as_str(), "id" | "created_at" | "updated_at") {
            continue;
        }
        let old_val = old.get(key).cloned().unwrap_or(Value::Null);
        if old_val != *new_val {
            diff.insert(key.clone(), json!({ "from": old_val, "to": new_val }));
        }
    }
    // Optional fields are dropped from the JSON when cleared
    for (key, old_val) in &old {
        if matches!(key.as_str(), "id" | "created_at" | "updated_at") || new.contains_key(key) {
            continue;
        }
        diff.insert(key.clone(), json!({ "from": old_val, "to": Value::Null }));
    }

    if diff.is_empty() {
        None
    } else {
        Some(Value::Object(diff))
    }
}

/// Converts a multipart read failure, keeping the status axum assigned:
/// a body over the length limit stays a 413, not a generic 400.
pub(crate) fn multipart_error(e: MultipartError) -> ApiError {
    ApiError {
        status: e.status(),
        message: format!("Invalid multipart request: {e}"),
    }
}

/// Parses a status value from a request, mapping unknown values to a 400.
pub(crate) fn parse_status<T>(value: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(ApiError::bad_request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Company;
    use chrono::Utc;

    #[test]
    fn test_change_diff_tracks_set_and_cleared_fields() {
        let now = Utc::now();
        let old = Company {
            id: 1,
            name: "Signal Co".to_string(),
            website: Some("https://signal.example".to_string()),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let mut new = old.clone();
        new.name = "Signal Studio".to_string();
        new.website = None;
        new.notes = Some("renamed".to_string());
        new.updated_at = Utc::now();

        let diff = change_diff(&old, &new).unwrap();
        let obj = diff.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["name"]["from"], "Signal Co");
        assert_eq!(obj["name"]["to"], "Signal Studio");
        assert_eq!(obj["website"]["to"], Value::Null);
        assert_eq!(obj["notes"]["from"], Value::Null);
        assert!(!obj.contains_key("updated_at"));
    }

    #[test]
    fn test_change_diff_none_when_unchanged() {
        let now = Utc::now();
        let company = Company {
            id: 1,
            name: "Signal Co".to_string(),
            website: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert!(change_diff(&company, &company.clone()).is_none());
    }
}
