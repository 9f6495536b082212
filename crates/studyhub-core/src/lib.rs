//! # StudyHub Core
//!
//! Shared building blocks for the StudyHub client: the rows mirrored from
//! the hosted database, a small query model, and the [`Backend`] trait that
//! every persistence, auth, storage and realtime call goes through.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use studyhub_core::{Database, InMemoryBackend, Query, Direction, model::Discussion};
//!
//! #[tokio::main]
//! async fn main() {
//!     let db = Database::new(Arc::new(InMemoryBackend::new()));
//!     let latest: Vec<Discussion> = db
//!         .fetch(Query::table("discussions").order("created_at", Direction::Descending))
//!         .await
//!         .unwrap();
//!     assert!(latest.is_empty());
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;

pub use backend::{AuthUser, Backend, ChangeEvent, ChangeKind, Database, Session, Subscription};
pub use config::BackendConfig;
pub use error::{CoreError, Result};
pub use memory::InMemoryBackend;
pub use query::{Direction, Filter, FilterOp, Query};
