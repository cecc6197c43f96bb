//! # Wharf
//!
//! A container image registry core, usable both as a standalone binary and as a library.
//!
//! Two pieces carry the registry's rules:
//!
//! - [`auth`] decides whether a caller may pull from or push to a repository,
//!   based on namespace ownership, organization ownership and team privileges.
//! - [`manifest`] records a schema 1 image manifest as individual image
//!   records: metadata, layer reference, checksum and ancestry.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wharf::config::ServerConfig;
//! use wharf::server::{AppState, create_router};
//! use wharf::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `wharf` binary. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod server;
pub mod store;
pub mod types;
