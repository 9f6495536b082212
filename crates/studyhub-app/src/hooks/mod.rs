//! Data hooks mirroring backend tables into Dioxus signals.
//!
//! Each hook comes in two halves: a plain async service over
//! [`Database`](studyhub_core::Database) that tests drive directly, and a
//! `use_*` function that keeps the service's results in signals, re-fetches
//! after mutations and reports outcomes as toasts.

pub mod auth;
pub mod chat;
pub mod discussions;
pub mod files;
pub mod group_chat;
pub mod groups;
pub mod stats;
pub mod toast;

use std::collections::HashMap;
use std::path::PathBuf;

use studyhub_core::model::{Profile, tables};
use studyhub_core::query::Query;
use studyhub_core::{CoreError, Database};
use uuid::Uuid;

/// Errors surfaced by hooks.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Required form input missing or blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// Local file could not be read for upload.
    #[error("Cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Download could not be written to disk.
    #[error("Cannot save {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Upload exceeds the size limit.
    #[error("File is too large ({size} bytes); the limit is 50 MB")]
    FileTooLarge { size: u64 },

    #[error("You are already a member of this group")]
    AlreadyMember,
}

impl HookError {
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, HookError::Core(CoreError::NotAuthenticated))
    }
}

pub type HookResult<T> = std::result::Result<T, HookError>;

/// Trimmed text, or `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed required field.
pub(crate) fn required(value: &str, field: &'static str) -> HookResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HookError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Profiles for a set of user ids, keyed by id.
pub(crate) async fn profiles_by_id(
    db: &Database,
    ids: impl IntoIterator<Item = Uuid>,
) -> HookResult<HashMap<Uuid, Profile>> {
    let mut ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let profiles: Vec<Profile> = db
        .fetch(Query::table(tables::PROFILES).in_("id", ids))
        .await?;
    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use studyhub_core::{Backend, Database, InMemoryBackend};
    use uuid::Uuid;

    /// A fresh in-memory database with one signed-in user.
    pub async fn signed_in(name: &str) -> (Database, Arc<InMemoryBackend>, Uuid) {
        studyhub_logging::init_testing();
        let backend = Arc::new(InMemoryBackend::new());
        let email = format!("{}@uni.edu", name.to_lowercase().replace(' ', "."));
        let session = backend.sign_up(&email, "secret1", name).await.unwrap();
        let db = Database::new(backend.clone());
        (db, backend, session.user.id)
    }

    /// Register another user and switch the session to them.
    pub async fn switch_to(backend: &InMemoryBackend, name: &str) -> Uuid {
        let email = format!("{}@uni.edu", name.to_lowercase().replace(' ', "."));
        backend.sign_up(&email, "secret1", name).await.unwrap().user.id
    }
}
