mod common;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};

use common::{Part, delete, get, get_raw, send_json, send_multipart, spawn_app};

#[tokio::test]
async fn test_health() {
    let app = spawn_app();
    let response = get_raw(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_contact_lifecycle() {
    let app = spawn_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/contacts",
        json!({"first_name": "Jane", "last_name": "Doe", "email": "jane@x.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["first_name"], "Jane");

    let (status, body) = get(&app, "/api/v1/contacts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/api/v1/contacts/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jane@x.com");
    assert!(body["data"]["leads"].as_array().unwrap().is_empty());

    let (status, body) = send_json(
        &app,
        "PUT",
        "/api/v1/contacts/1",
        json!({"first_name": "Jane", "last_name": "Doe", "email": "jane@x.com", "phone": "555-0100"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "555-0100");

    let (status, _) = delete(&app, "/api/v1/contacts/1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, "/api/v1/contacts/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"], Value::Null);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_contact_search() {
    let app = spawn_app();

    for (first, last, email) in [
        ("Jane", "Doe", "jane@x.com"),
        ("Sam", "Rivera", "sam@beta.example"),
    ] {
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/contacts",
            json!({"first_name": first, "last_name": last, "email": email}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(&app, "/api/v1/contacts?q=jane").await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["first_name"], "Jane");
}

#[tokio::test]
async fn test_company_search() {
    let app = spawn_app();

    for (name, website) in [
        ("Signal Co", "https://signal.example"),
        ("Gamma Works", "https://gamma.example"),
    ] {
        send_json(
            &app,
            "POST",
            "/api/v1/companies",
            json!({"name": name, "website": website}),
        )
        .await;
    }

    let (status, body) = get(&app, "/api/v1/companies?q=signal").await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "Signal Co");

    let (_, body) = get(&app, "/api/v1/companies").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_company_name_required() {
    let app = spawn_app();
    let (status, body) = send_json(&app, "POST", "/api/v1/companies", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_lead_status_flow() {
    let app = spawn_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/leads",
        json!({"title": "Website redesign", "value_estimate": 4500.0}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "NEW");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/v1/leads/{id}/status"),
        json!({"status": "WON"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "WON");

    let (_, body) = get(&app, "/api/v1/leads?status=WON").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/api/v1/leads?status=LOST").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/v1/leads/{id}/status"),
        json!({"status": "SHIPPED"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/v1/leads?status=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lead_rejects_dead_references() {
    let app = spawn_app();
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/leads",
        json!({"title": "Bad ref", "contact_id": 999}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_update_is_idempotent() {
    let app = spawn_app();

    send_json(
        &app,
        "POST",
        "/api/v1/ideas",
        json!({"title": "Newsletter", "tags": "marketing"}),
    )
    .await;

    let payload = json!({"title": "Newsletter", "status": "IN_PROGRESS", "tags": "marketing"});
    let (status, first) = send_json(&app, "PUT", "/api/v1/ideas/1", payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send_json(&app, "PUT", "/api/v1/ideas/1", payload).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first["data"]["title"], second["data"]["title"]);
    assert_eq!(first["data"]["status"], second["data"]["status"]);
    assert_eq!(first["data"]["tags"], second["data"]["tags"]);

    let (_, body) = get(&app, "/api/v1/ideas/1").await;
    assert_eq!(body["data"]["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn test_project_tasks() {
    let app = spawn_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/projects",
        json!({"name": "Brand refresh", "budget": 12000.0}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "ACTIVE");
    let project_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/v1/projects/{project_id}/tasks"),
        json!({"title": "Moodboard"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "TODO");
    let task_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/v1/tasks/{task_id}/status"),
        json!({"status": "DOING"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "DOING");

    let (_, body) = get(&app, &format!("/api/v1/projects/{project_id}")).await;
    assert_eq!(body["data"]["tasks"].as_array().unwrap().len(), 1);

    // Deleting the project takes its tasks with it
    let (status, _) = delete(&app, &format!("/api/v1/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &format!("/api/v1/tasks/{task_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activity_feed_tracks_mutations() {
    let app = spawn_app();

    send_json(
        &app,
        "POST",
        "/api/v1/contacts",
        json!({"first_name": "Jane", "last_name": "Doe"}),
    )
    .await;
    send_json(
        &app,
        "PUT",
        "/api/v1/contacts/1",
        json!({"first_name": "Jane", "last_name": "Doe", "role": "Art director"}),
    )
    .await;
    delete(&app, "/api/v1/contacts/1").await;

    let (status, body) = get(&app, "/api/v1/activity").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["action"], "DELETE");
    assert_eq!(entries[1]["action"], "UPDATE");
    assert_eq!(entries[2]["action"], "CREATE");

    // The update entry carries a field-level diff
    assert_eq!(entries[1]["changes"]["role"]["to"], "Art director");

    let (_, body) = get(&app, "/api/v1/activity?limit=2").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_overview() {
    let app = spawn_app();

    send_json(
        &app,
        "POST",
        "/api/v1/contacts",
        json!({"first_name": "Jane", "last_name": "Doe"}),
    )
    .await;
    send_json(&app, "POST", "/api/v1/leads", json!({"title": "Logo"})).await;

    let (status, body) = get(&app, "/api/v1/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["counts"]["contacts"], 1);
    assert_eq!(body["data"]["counts"]["leads"], 1);
    assert_eq!(body["data"]["counts"]["projects"], 0);
    assert_eq!(body["data"]["recent_activity"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_calendar_merges_events_and_open_tasks() {
    let app = spawn_app();
    let now = Utc::now();
    let fmt = |dt: chrono::DateTime<Utc>| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    send_json(
        &app,
        "POST",
        "/api/v1/events",
        json!({"title": "Kickoff call", "start": fmt(now + Duration::days(1))}),
    )
    .await;
    send_json(
        &app,
        "POST",
        "/api/v1/events",
        json!({"title": "Retro", "start": fmt(now + Duration::days(30))}),
    )
    .await;

    send_json(&app, "POST", "/api/v1/projects", json!({"name": "Brand refresh"})).await;
    send_json(
        &app,
        "POST",
        "/api/v1/projects/1/tasks",
        json!({"title": "Moodboard", "due_date": fmt(now + Duration::days(2))}),
    )
    .await;
    send_json(
        &app,
        "POST",
        "/api/v1/projects/1/tasks",
        json!({"title": "Done thing", "status": "DONE", "due_date": fmt(now + Duration::days(2))}),
    )
    .await;

    let path = format!(
        "/api/v1/calendar?from={}&to={}",
        fmt(now),
        fmt(now + Duration::days(7))
    );
    let (status, body) = get(&app, &path).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["kind"], "event");
    assert_eq!(items[0]["title"], "Kickoff call");
    assert_eq!(items[1]["kind"], "task");
    assert_eq!(items[1]["title"], "Moodboard");
}

#[tokio::test]
async fn test_event_end_before_start_rejected() {
    let app = spawn_app();
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/events",
        json!({
            "title": "Backwards",
            "start": "2026-09-02T10:00:00Z",
            "end": "2026-09-01T10:00:00Z"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_asset_upload_and_download() {
    let app = spawn_app();

    let (status, body) = send_multipart(
        &app,
        "/api/v1/assets",
        &[
            Part::Text("tags", "brand"),
            Part::File("files", "logo.png", "image/png", b"fake png bytes"),
            Part::File("files", "deck.pdf", "application/pdf", b"fake pdf bytes!"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = body["data"]["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["filename"], "logo.png");
    assert_eq!(created[0]["mime_type"], "image/png");
    assert_eq!(created[0]["size_bytes"], 14);
    assert_eq!(created[0]["tags"], "brand");
    let id = created[0]["id"].as_i64().unwrap();

    // The stored file exists under {uuid}_{name}
    let stored_name = created[0]["stored_name"].as_str().unwrap();
    assert!(stored_name.ends_with("_logo.png"));
    assert!(app.upload_dir().join(stored_name).exists());

    let response = get_raw(&app, &format!("/api/v1/assets/{id}/download")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "image/png"
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("logo.png")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"fake png bytes");
}

#[tokio::test]
async fn test_asset_duplicate_skipped() {
    let app = spawn_app();

    let parts = [Part::File("files", "logo.png", "image/png", b"fake png bytes".as_slice())];
    let (status, _) = send_multipart(&app, "/api/v1/assets", &parts).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_multipart(&app, "/api/v1/assets", &parts).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["created"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["skipped_duplicates"][0], "logo.png");

    let (_, body) = get(&app, "/api/v1/assets").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_oversized_upload_rejected_and_writes_nothing() {
    let app = spawn_app();

    let data = vec![0u8; 25 * 1024 * 1024 + 1];
    let (status, body) = send_multipart(
        &app,
        "/api/v1/assets",
        &[Part::File("files", "big.png", "image/png", &data)],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());

    let (_, body) = get(&app, "/api/v1/assets").await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let dir_is_empty = !app.upload_dir().exists()
        || std::fs::read_dir(app.upload_dir()).unwrap().next().is_none();
    assert!(dir_is_empty);
}

#[tokio::test]
async fn test_unsupported_file_type_rejected() {
    let app = spawn_app();

    let (status, body) = send_multipart(
        &app,
        "/api/v1/assets",
        &[Part::File(
            "files",
            "tool.exe",
            "application/x-msdownload",
            b"MZ",
        )],
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());

    let (_, body) = get(&app, "/api/v1/assets").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_asset_filters_and_metadata() {
    let app = spawn_app();

    send_json(&app, "POST", "/api/v1/projects", json!({"name": "Brand refresh"})).await;
    send_multipart(
        &app,
        "/api/v1/assets",
        &[
            Part::Text("project_id", "1"),
            Part::File("files", "logo.png", "image/png", b"png"),
        ],
    )
    .await;
    send_multipart(
        &app,
        "/api/v1/assets",
        &[Part::File("files", "deck.pdf", "application/pdf", b"pdf!")],
    )
    .await;

    let (_, body) = get(&app, "/api/v1/assets?kind=image").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["filename"], "logo.png");

    let (_, body) = get(&app, "/api/v1/assets?project_id=1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/api/v1/assets?kind=archive").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Re-link and tag the pdf
    let (_, body) = get(&app, "/api/v1/assets?q=deck").await;
    let id = body["data"][0]["id"].as_i64().unwrap();
    let (status, body) = send_json(
        &app,
        "PATCH",
        &format!("/api/v1/assets/{id}"),
        json!({"tags": "pitch", "project_id": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], "pitch");
    assert_eq!(body["data"]["project_id"], 1);
}

#[tokio::test]
async fn test_asset_delete_removes_file() {
    let app = spawn_app();

    let (_, body) = send_multipart(
        &app,
        "/api/v1/assets",
        &[Part::File("files", "logo.png", "image/png", b"png")],
    )
    .await;
    let id = body["data"]["created"][0]["id"].as_i64().unwrap();
    let stored_name = body["data"]["created"][0]["stored_name"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(app.upload_dir().join(&stored_name).exists());

    let (status, _) = delete(&app, &format!("/api/v1/assets/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.upload_dir().join(&stored_name).exists());

    let (status, _) = get(&app, &format!("/api/v1/assets/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_import() {
    let app = spawn_app();

    let csv = "Name,E-Mail Address,Company,Phone\n\
        Jane Doe,jane.doe@x.com,Acme,555-0100\n\
        ,sam.rivera@y.org,Acme,\n\
        Jane Doe,jane.doe@x.com,Acme,555-0100\n\
        No Email Person,,,\n";

    let (status, body) = send_multipart(
        &app,
        "/api/v1/contacts/import",
        &[Part::File("file", "contacts.csv", "text/csv", csv.as_bytes())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["imported"], 3);
    assert_eq!(body["data"]["skipped"], 1);
    assert_eq!(body["data"]["companies_created"], 1);

    // Name fell back to the email's local part
    let (_, body) = get(&app, "/api/v1/contacts?q=rivera").await;
    let hits = body["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["first_name"], "Sam");
    assert_eq!(hits[0]["last_name"], "Rivera");

    let (_, body) = get(&app, "/api/v1/companies").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Acme");
}

#[tokio::test]
async fn test_company_delete_keeps_contacts() {
    let app = spawn_app();

    send_json(&app, "POST", "/api/v1/companies", json!({"name": "Acme"})).await;
    send_json(
        &app,
        "POST",
        "/api/v1/contacts",
        json!({"first_name": "Jane", "last_name": "Doe", "company_id": 1}),
    )
    .await;

    let (status, _) = delete(&app, "/api/v1/companies/1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = get(&app, "/api/v1/contacts/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["company_id"], Value::Null);
}

#[tokio::test]
async fn test_upload_past_body_limit_is_413() {
    let app = spawn_app();

    // Larger than the whole request body cap, so the failure comes from the
    // multipart reader rather than the per-file size check
    let data = vec![0u8; 51 * 1024 * 1024];
    let (status, body) = send_multipart(
        &app,
        "/api/v1/assets",
        &[Part::File("files", "huge.png", "image/png", &data)],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_csv_import_over_size_limit_rejected() {
    let app = spawn_app();

    let mut csv = b"Name,Email\n".to_vec();
    csv.resize(26 * 1024 * 1024, b'#');
    let (status, body) = send_multipart(
        &app,
        "/api/v1/contacts/import",
        &[Part::File("file", "contacts.csv", "text/csv", &csv)],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());

    let (_, body) = get(&app, "/api/v1/contacts").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
