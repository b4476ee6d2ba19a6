//! # Atelier
//!
//! A self-hostable CRM for running a freelance design business, usable both
//! as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! atelier = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use atelier::server::{AppState, create_router};
//! use atelier::store::{SqliteStore, Store};
//! use atelier::uploads::UploadStore;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/atelier.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     uploads: UploadStore::new(&PathBuf::from("./data")),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI. Disable with `default-features = false`.

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
pub mod uploads;
