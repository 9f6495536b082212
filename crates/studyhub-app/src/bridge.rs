//! Backend bridge: connects the hosted (or in-memory) backend to the UI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use studyhub_client::StudyHubClient;
use studyhub_core::{AuthUser, Backend, BackendConfig, CoreError, Database, InMemoryBackend, Session};

use crate::demo;
use crate::hooks::HookResult;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STUDYHUB_DATA_DIR";

const SESSION_FILE: &str = "session.json";

/// Settings handed from the command line to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSettings {
    /// Backend config file; environment variables are used when absent.
    pub config_path: Option<PathBuf>,
    /// Run against the seeded in-memory backend.
    pub offline: bool,
    pub data_dir: PathBuf,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            config_path: None,
            offline: false,
            data_dir: default_data_dir(),
        }
    }
}

/// Platform-specific data directory for the persisted session.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("studyhub"))
        .unwrap_or_else(|| PathBuf::from(".").join("studyhub"))
}

/// Where downloaded library files are saved: the user's download folder
/// when the platform has one, else `downloads` under the data directory.
pub fn downloads_dir(data_dir: &Path) -> PathBuf {
    dirs::download_dir()
        .filter(|d| d.is_dir())
        .unwrap_or_else(|| data_dir.join("downloads"))
}

/// Session persisted between launches.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: Some(dir.join(SESSION_FILE)),
        }
    }

    /// A store that never touches the disk.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn load(&self) -> Option<Session> {
        let path = self.path.as_ref()?;
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        let Some(path) = self.path.as_ref().filter(|p| p.exists()) else {
            return;
        };
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove session file");
        }
    }
}

/// Handle to the running backend.
pub struct AppHandle {
    pub db: Database,
    pub config: BackendConfig,
    pub data_dir: PathBuf,
    pub offline: bool,
    client: Option<Arc<StudyHubClient>>,
    sessions: SessionStore,
}

impl std::fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppHandle")
            .field("offline", &self.offline)
            .finish_non_exhaustive()
    }
}

impl PartialEq for AppHandle {
    fn eq(&self, other: &Self) -> bool {
        self.db == other.db
    }
}

impl AppHandle {
    /// Handle over an arbitrary backend, without session persistence.
    pub fn with_backend(backend: Arc<dyn Backend>, config: BackendConfig, data_dir: PathBuf) -> Self {
        Self {
            db: Database::new(backend),
            config,
            data_dir,
            offline: true,
            client: None,
            sessions: SessionStore::disabled(),
        }
    }

    /// Bucket uploads go to.
    pub fn bucket(&self) -> &str {
        &self.config.storage_bucket
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Reattach the session saved by a previous launch.
    pub async fn restore_session(&self) -> Option<AuthUser> {
        let saved = self.sessions.load()?;
        let backend = self.db.backend();

        if saved.is_expired(Utc::now()) {
            let Some(client) = &self.client else {
                self.sessions.clear();
                return None;
            };
            client.restore(saved);
            return match client.refresh_session().await {
                Ok(Some(fresh)) => {
                    self.persist(&fresh);
                    Some(fresh.user)
                }
                Ok(None) => {
                    self.sessions.clear();
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Saved session could not be refreshed");
                    self.sessions.clear();
                    None
                }
            };
        }

        let user = saved.user.clone();
        backend.restore(saved);
        tracing::info!(user = %user.id, "Restored saved session");
        Some(user)
    }

    /// Save the session for the next launch; failures are logged only.
    pub fn persist(&self, session: &Session) {
        if let Err(e) = self.sessions.save(session) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}

/// Keeps the session file in step with tokens rotated mid-run.
fn persist_refreshed(store: SessionStore) -> impl Fn(&Session) + Send + Sync + 'static {
    move |session: &Session| {
        if let Err(e) = store.save(session) {
            tracing::warn!(error = %e, "Failed to persist refreshed session");
        }
    }
}

/// Connect to the backend described by `settings`.
pub async fn connect(settings: &LaunchSettings) -> HookResult<AppHandle> {
    if settings.offline {
        let backend = Arc::new(InMemoryBackend::new());
        demo::seed(&backend).await?;
        tracing::info!("Running offline with demo data");
        return Ok(AppHandle::with_backend(
            backend,
            BackendConfig::default(),
            settings.data_dir.clone(),
        ));
    }

    let config = match &settings.config_path {
        Some(path) => BackendConfig::load(path)?,
        None => BackendConfig::from_env()?,
    };
    config.validate()?;
    let client = Arc::new(StudyHubClient::new(config.clone()).map_err(CoreError::from)?);
    let sessions = SessionStore::in_dir(&settings.data_dir);
    client.on_session_refreshed(persist_refreshed(sessions.clone()));
    let backend: Arc<dyn Backend> = client.clone();

    Ok(AppHandle {
        db: Database::new(backend),
        config,
        data_dir: settings.data_dir.clone(),
        offline: false,
        client: Some(client),
        sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhub_core::AuthUser;
    use uuid::Uuid;

    fn session(expired: bool) -> Session {
        let offset = if expired { -60 } else { 3600 };
        Session {
            access_token: "jwt".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(offset)),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("sarah@uni.edu".into()),
            },
        }
    }

    #[test]
    fn test_session_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(&dir.path().join("nested"));
        assert!(store.load().is_none());

        let saved = session(false);
        store.save(&saved).unwrap();
        assert_eq!(store.load(), Some(saved));

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_disabled_store_is_inert() {
        let store = SessionStore::disabled();
        store.save(&session(false)).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_downloads_dir_is_an_existing_folder_or_falls_back() {
        let data = PathBuf::from("/tmp/studyhub-data");
        let dir = downloads_dir(&data);
        assert!(dir.is_dir() || dir == data.join("downloads"));
        if let Some(platform) = dirs::download_dir().filter(|d| d.is_dir()) {
            assert_eq!(dir, platform);
        }
    }

    #[test]
    fn test_refreshed_session_is_written_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        store.save(&session(true)).unwrap();

        let rotated = session(false);
        persist_refreshed(store.clone())(&rotated);
        assert_eq!(store.load(), Some(rotated));
    }

    #[tokio::test]
    async fn test_offline_connect_seeds_demo_data() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LaunchSettings {
            config_path: None,
            offline: true,
            data_dir: dir.path().to_path_buf(),
        };
        let handle = connect(&settings).await.unwrap();
        assert!(handle.offline);
        assert!(handle.db.current_user().is_none());
        assert!(handle.restore_session().await.is_none());
    }

    #[tokio::test]
    async fn test_online_connect_requires_config() {
        let settings = LaunchSettings {
            config_path: Some(PathBuf::from("/nonexistent/studyhub.toml")),
            offline: false,
            data_dir: PathBuf::from("."),
        };
        let err = connect(&settings).await.unwrap_err();
        assert!(matches!(err, crate::hooks::HookError::Core(CoreError::Config(_))));
    }
}
