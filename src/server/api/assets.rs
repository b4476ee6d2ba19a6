use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use tokio_util::io::ReaderStream;

use super::{change_diff, multipart_error, record};
use crate::server::AppState;
use crate::server::dto::{AssetListParams, AssetUpdateRequest, UploadOutcome};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::types::{ActivityAction, Asset, NewActivity};
use crate::uploads::{MAX_UPLOAD_BYTES, resolve_mime, sanitize_filename};

const DEFAULT_LIST_LIMIT: i64 = 200;
const KINDS: &[&str] = &["image", "video", "document", "other"];

struct PendingFile {
    filename: String,
    mime_type: Option<String>,
    data: axum::body::Bytes,
}

pub async fn upload_assets(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut tags: Option<String> = None;
    let mut notes: Option<String> = None;
    let mut project_id: Option<i64> = None;
    let mut contact_id: Option<i64> = None;
    let mut files: Vec<PendingFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().map(str::to_string).as_deref() {
            Some("tags") => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    tags = Some(value.trim().to_string());
                }
            }
            Some("notes") => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    notes = Some(value.trim().to_string());
                }
            }
            Some("project_id") => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    project_id = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ApiError::bad_request("Invalid project_id"))?,
                    );
                }
            }
            Some("contact_id") => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    contact_id = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ApiError::bad_request("Invalid contact_id"))?,
                    );
                }
            }
            _ => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let declared = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                let filename = sanitize_filename(&filename);
                let mime_type = resolve_mime(&filename, declared.as_deref())?;
                if data.len() as i64 > MAX_UPLOAD_BYTES {
                    return Err(ApiError::payload_too_large(format!(
                        "\"{filename}\" is {} bytes; the limit is {MAX_UPLOAD_BYTES} bytes",
                        data.len()
                    )));
                }
                files.push(PendingFile {
                    filename,
                    mime_type,
                    data,
                });
            }
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let mut outcome = UploadOutcome {
        created: Vec::new(),
        skipped_duplicates: Vec::new(),
    };

    for file in files {
        let size = file.data.len() as i64;
        let duplicate = state.store.find_duplicate_asset(
            &file.filename,
            size,
            file.mime_type.as_deref(),
        )?;
        if duplicate.is_some() {
            outcome.skipped_duplicates.push(file.filename);
            continue;
        }

        let stored_name = state.uploads.save(&file.filename, &file.data).await?;

        let mut asset = Asset {
            id: 0,
            filename: file.filename,
            stored_name,
            mime_type: file.mime_type,
            size_bytes: size,
            tags: tags.clone(),
            project_id,
            contact_id,
            notes: notes.clone(),
            created_at: Utc::now(),
        };
        asset.id = match state.store.create_asset(&asset) {
            Ok(id) => id,
            Err(e) => {
                // The row is the source of truth; drop the orphaned file
                let _ = state.uploads.delete(&asset.stored_name).await;
                return Err(e.into());
            }
        };

        record(
            state.store.as_ref(),
            NewActivity {
                action: ActivityAction::Upload,
                entity_type: "Asset",
                entity_id: Some(asset.id),
                summary: format!("Uploaded \"{}\" ({} bytes)", asset.filename, size),
                changes: None,
            },
        );

        outcome.created.push(asset);
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(multipart_error)
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssetListParams>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(kind) = params.kind.as_deref() {
        if !KINDS.contains(&kind) {
            return Err(ApiError::bad_request(format!(
                "Unknown kind \"{kind}\"; expected one of image, video, document, other"
            )));
        }
    }

    let filter = crate::store::AssetFilter {
        q: params.q,
        project_id: params.project_id,
        contact_id: params.contact_id,
        kind: params.kind,
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1000);

    let assets = state.store.list_assets(&filter, limit)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.store.get_asset(id)?.or_not_found("Asset not found")?;
    Ok(Json(ApiResponse::success(asset)))
}

pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AssetUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state.store.get_asset(id)?.or_not_found("Asset not found")?;

    let asset = Asset {
        tags: req.tags,
        project_id: req.project_id,
        contact_id: req.contact_id,
        notes: req.notes,
        ..existing.clone()
    };
    state.store.update_asset(&asset)?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Update,
            entity_type: "Asset",
            entity_id: Some(id),
            summary: format!("Updated asset \"{}\"", asset.filename),
            changes: change_diff(&existing, &asset),
        },
    );

    Ok(Json(ApiResponse::success(asset)))
}

pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.store.get_asset(id)?.or_not_found("Asset not found")?;

    state.store.delete_asset(id)?;
    state.uploads.delete(&asset.stored_name).await?;

    record(
        state.store.as_ref(),
        NewActivity {
            action: ActivityAction::Delete,
            entity_type: "Asset",
            entity_id: Some(id),
            summary: format!("Deleted asset \"{}\"", asset.filename),
            changes: None,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.store.get_asset(id)?.or_not_found("Asset not found")?;

    let file = state.uploads.open(&asset.stored_name).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let safe_name = asset.filename.replace(['"', '\r', '\n'], "_");
    let headers = [
        (
            header::CONTENT_TYPE,
            asset
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe_name}\""),
        ),
        (header::CONTENT_LENGTH, asset.size_bytes.to_string()),
    ];

    Ok((headers, body))
}
