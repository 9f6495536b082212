//! StudyHub backend client.
//!
//! [`StudyHubClient`] implements [`studyhub_core::Backend`] against a hosted
//! Postgres-REST project:
//!
//! - **rest**: table reads and writes on `/rest/v1`
//! - **auth**: password sign-in, sign-up and refresh on `/auth/v1`
//! - **storage**: object upload and download on `/storage/v1`
//! - **realtime**: row change feeds over the `/realtime/v1` WebSocket
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use studyhub_client::StudyHubClient;
//! use studyhub_core::{BackendConfig, Database};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackendConfig::from_env()?;
//! let db = Database::new(Arc::new(StudyHubClient::new(config)?));
//! # let _ = db;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
pub mod error;
pub mod realtime;
pub mod rest;
pub mod storage;

pub use client::StudyHubClient;
pub use error::{ClientError, Result};
