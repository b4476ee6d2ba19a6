use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::api::api_router;
use crate::store::Store;
use crate::uploads::{MAX_UPLOAD_BYTES, UploadStore};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub uploads: UploadStore,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Body limit sits above the per-file ceiling so oversized uploads reach
    // the handler and get a 413 in the standard envelope, with headroom for
    // multipart framing.
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize * 2))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
