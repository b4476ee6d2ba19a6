use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{change_diff, multipart_error, record};
use crate::server::AppState;
use crate::server::dto::{ContactDetail, ContactPayload, ImportSummary, SearchParams};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::store::Store;
use crate::types::{ActivityAction, Company, Contact, NewActivity};
use crate::uploads::MAX_UPLOAD_BYTES;

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if req.first_name.trim().is_empty() && req.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("Contact name is required"));
    }

    let now = Utc::now();
    let mut contact = Contact {
        id: 0,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        role: req.role,
        company_id: req.company_id,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    contact.id = state.store.create_contact(&contact)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Contact",
            entity_id: Some(contact.id),
            summary: format!("Created contact {} {}", contact.first_name, contact.last_name),
            changes: None,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(contact))))
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = state.store.list_contacts(params.q.as_deref())?;
    Ok(Json(ApiResponse::success(contacts)))
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.store.get_contact(id)?.or_not_found("Contact not found")?;

    let detail = ContactDetail {
        leads: state.store.list_contact_leads(id)?,
        projects: state.store.list_contact_projects(id)?,
        assets: state.store.list_contact_assets(id)?,
        activity: state.store.list_entity_activity("Contact", id, 50)?,
        contact,
    };

    Ok(Json(ApiResponse::success(detail)))
}

pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ContactPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.get_contact(id)?.or_not_found("Contact not found")?;

    let contact = Contact {
        id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        role: req.role,
        company_id: req.company_id,
        notes: req.notes,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_contact(&contact)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Contact",
            entity_id: Some(id),
            summary: format!("Updated contact {} {}", contact.first_name, contact.last_name),
            changes: change_diff(&existing, &contact),
        },
    );

    Ok(Json(ApiResponse::success(contact)))
}

pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state.store.get_contact(id)?.or_not_found("Contact not found")?;
    state.store.delete_contact(id)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Contact",
            entity_id: Some(id),
            summary: format!("Deleted contact {} {}", contact.first_name, contact.last_name),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_contacts(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut data = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.file_name().is_some() || field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }
    let data = data.ok_or_else(|| ApiError::bad_request("No CSV file provided"))?;

    // The import file gets the same ceiling as any other upload
    if data.len() as i64 > MAX_UPLOAD_BYTES {
        return Err(ApiError::payload_too_large(format!(
            "CSV file is {} bytes; the limit is {MAX_UPLOAD_BYTES} bytes",
            data.len()
        )));
    }

    let summary = import_csv(state.store.as_ref(), &data)?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Canonical form of an incoming CSV header: lowercased with everything
/// but letters and digits stripped, so "E-Mail Address" matches "email".
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn header_index(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&normalize_header(h).as_str()))
}

/// Pulls every email-looking token out of a cell; rows exported from mail
/// clients often pack several addresses separated by commas or slashes.
fn extract_emails(value: &str) -> Vec<String> {
    value
        .split([',', ';', '/', ' ', '\t'])
        .map(|t| t.trim().trim_matches(['<', '>', '"']))
        .filter(|t| t.contains('@') && t.len() > 2)
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Builds a display name from an email's local part: "jane.doe" becomes
/// ("Jane", "Doe").
fn name_from_email(email: &str) -> (String, String) {
    let local = email.split('@').next().unwrap_or("");
    let mut words = local
        .split(['.', '_', '-', '+'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        });
    let first = words.next().unwrap_or_default();
    let last = words.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn get_or_create_company(
    store: &dyn Store,
    name: &str,
    summary: &mut ImportSummary,
) -> Result<i64, ApiError> {
    if let Some(company) = store.find_company_by_name(name)? {
        return Ok(company.id);
    }
    let now = Utc::now();
    let id = store.create_company(&Company {
        id: 0,
        name: name.to_string(),
        website: None,
        notes: None,
        created_at: now,
        updated_at: now,
    })?;
    summary.companies_created += 1;
    record(
        store,
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Company",
            entity_id: Some(id),
            summary: format!("Created company \"{name}\" during import"),
            changes: None,
        },
    );
    Ok(id)
}

fn import_csv(store: &dyn Store, data: &[u8]) -> Result<ImportSummary, ApiError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| ApiError::bad_request(format!("Invalid CSV: {e}")))?
        .clone();

    let first_col = header_index(&headers, &["firstname", "first", "givenname"]);
    let last_col = header_index(&headers, &["lastname", "last", "surname", "familyname"]);
    let name_col = header_index(&headers, &["name", "fullname", "contact", "contactname"]);
    let email_col = header_index(&headers, &["email", "emailaddress", "mail"]);
    let phone_col = header_index(&headers, &["phone", "phonenumber", "mobile", "tel", "telephone"]);
    let company_col = header_index(&headers, &["company", "organization", "organisation", "org"]);
    let role_col = header_index(&headers, &["role", "title", "jobtitle", "position"]);
    let notes_col = header_index(&headers, &["notes", "note", "comments"]);

    let cell = |rec: &csv::StringRecord, col: Option<usize>| -> Option<String> {
        col.and_then(|i| rec.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut summary = ImportSummary::default();
    for result in reader.records() {
        let rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                tracing::warn!("Skipping malformed CSV row: {}", e);
                summary.skipped += 1;
                continue;
            }
        };

        let mut first = cell(&rec, first_col).unwrap_or_default();
        let mut last = cell(&rec, last_col).unwrap_or_default();
        if first.is_empty() && last.is_empty() {
            if let Some(full) = cell(&rec, name_col) {
                let mut parts = full.splitn(2, char::is_whitespace);
                first = parts.next().unwrap_or("").trim().to_string();
                last = parts.next().unwrap_or("").trim().to_string();
            }
        }

        let emails = cell(&rec, email_col)
            .map(|v| extract_emails(&v))
            .unwrap_or_default();

        let company_id = match cell(&rec, company_col) {
            Some(name) => Some(get_or_create_company(store, &name, &mut summary)?),
            None => None,
        };
        let phone = cell(&rec, phone_col);
        let role = cell(&rec, role_col);
        let notes = cell(&rec, notes_col);

        if emails.is_empty() {
            if first.is_empty() && last.is_empty() {
                summary.skipped += 1;
                continue;
            }
            create_imported(
                store,
                &mut summary,
                first.clone(),
                last.clone(),
                None,
                phone.clone(),
                role.clone(),
                company_id,
                notes.clone(),
            )?;
            continue;
        }

        for email in emails {
            if store.find_contact_by_email(&email)?.is_some() {
                summary.skipped += 1;
                continue;
            }
            let (mut f, mut l) = (first.clone(), last.clone());
            if f.is_empty() && l.is_empty() {
                (f, l) = name_from_email(&email);
            }
            create_imported(
                store,
                &mut summary,
                f,
                l,
                Some(email),
                phone.clone(),
                role.clone(),
                company_id,
                notes.clone(),
            )?;
        }
    }

    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn create_imported(
    store: &dyn Store,
    summary: &mut ImportSummary,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    role: Option<String>,
    company_id: Option<i64>,
    notes: Option<String>,
) -> Result<(), ApiError> {
    let now = Utc::now();
    let contact = Contact {
        id: 0,
        first_name,
        last_name,
        email,
        phone,
        role,
        company_id,
        notes,
        created_at: now,
        updated_at: now,
    };
    let id = store.create_contact(&contact)?;
    summary.imported += 1;

    record(
        store,
        NewActivity {
            action: ActivityAction::Create,
            entity_type: "Contact",
            entity_id: Some(id),
            summary: format!(
                "Imported contact {} {}",
                contact.first_name, contact.last_name
            ),
            changes: None,
        },
    );
    Ok(())
}
