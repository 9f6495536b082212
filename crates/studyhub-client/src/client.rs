//! The hosted-backend client and its [`Backend`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use studyhub_core::query::{Filter, Query};
use studyhub_core::{Backend, BackendConfig, CoreError, Session, Subscription};

use crate::auth::auth_error;
use crate::error::{ClientError, Result};
use crate::realtime::RealtimeHub;

/// Tokens this close to expiry are refreshed before the next request.
const REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Called with every session obtained by a token refresh.
pub type SessionListener = Arc<dyn Fn(&Session) + Send + Sync>;

/// Client for the hosted database, auth, storage and realtime services.
pub struct StudyHubClient {
    http: reqwest::Client,
    config: BackendConfig,
    session: Arc<RwLock<Option<Session>>>,
    /// Serializes refreshes so a burst of requests spends the refresh token once.
    refreshing: tokio::sync::Mutex<()>,
    on_refresh: RwLock<Option<SessionListener>>,
    realtime: RealtimeHub,
}

impl std::fmt::Debug for StudyHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyHubClient")
            .field("url", &self.config.base_url())
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}

impl StudyHubClient {
    /// Build a client for a validated configuration.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("studyhub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let realtime = RealtimeHub::new(&config);
        tracing::info!(url = %config.base_url(), "Backend client created");
        Ok(Self {
            http,
            config,
            session: Arc::new(RwLock::new(None)),
            refreshing: tokio::sync::Mutex::new(()),
            on_refresh: RwLock::new(None),
            realtime,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Bearer token for the next request: the session's, else the anon key.
    fn bearer(&self) -> String {
        self.session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    /// Request with the API key and bearer headers attached.
    ///
    /// Used as-is by the auth endpoints; data calls go through
    /// [`authorized`](Self::authorized).
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Like [`request`](Self::request), refreshing a stale session first.
    pub(crate) async fn authorized(&self, method: Method, url: &str) -> RequestBuilder {
        self.ensure_fresh().await;
        self.request(method, url)
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    /// Register a listener for refreshed sessions, e.g. to persist them.
    pub fn on_session_refreshed(&self, listener: impl Fn(&Session) + Send + Sync + 'static) {
        *self.on_refresh.write() = Some(Arc::new(listener));
    }

    fn needs_refresh(&self) -> bool {
        self.session.read().as_ref().is_some_and(|s| {
            s.refresh_token.is_some() && s.is_expired(Utc::now() + REFRESH_MARGIN)
        })
    }

    /// Refresh the session when its access token is expired or about to be.
    ///
    /// Failures are logged; the request then goes out with whatever
    /// credentials remain and the server decides.
    async fn ensure_fresh(&self) {
        if !self.needs_refresh() {
            return;
        }
        let _lock = self.refreshing.lock().await;
        // Another request may have refreshed while we waited.
        if !self.needs_refresh() {
            return;
        }
        if let Err(e) = self.refresh_session().await {
            tracing::warn!(error = %e, "Session refresh failed");
        }
    }

    /// Exchange the stored refresh token for a fresh session.
    ///
    /// Returns `Ok(None)` when there is nothing to refresh.
    pub async fn refresh_session(&self) -> std::result::Result<Option<Session>, CoreError> {
        let Some(refresh_token) = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
        else {
            return Ok(None);
        };
        match self.auth_refresh(&refresh_token).await {
            Ok(session) => {
                self.set_session(Some(session.clone()));
                tracing::debug!(user = %session.user.id, "Session refreshed");
                let listener = self.on_refresh.read().clone();
                if let Some(listener) = listener {
                    listener(&session);
                }
                Ok(Some(session))
            }
            // The server rejected the refresh token: the session is over.
            Err(e @ ClientError::Api { .. }) => {
                self.set_session(None);
                Err(e.into())
            }
            // Network trouble: keep the session for the next attempt.
            Err(e) => Err(e.into()),
        }
    }

    /// Number of live realtime topics.
    pub fn realtime_topics(&self) -> usize {
        self.realtime.topic_count()
    }
}

#[async_trait]
impl Backend for StudyHubClient {
    async fn select(&self, query: Query) -> studyhub_core::Result<Vec<Value>> {
        Ok(self.rest_select(&query).await?)
    }

    async fn count(&self, query: Query) -> studyhub_core::Result<u64> {
        Ok(self.rest_count(&query).await?)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> studyhub_core::Result<Vec<Value>> {
        Ok(self.rest_insert(table, &rows).await?)
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: Value,
    ) -> studyhub_core::Result<Vec<Value>> {
        Ok(self.rest_update(table, &filters, &patch).await?)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> studyhub_core::Result<u64> {
        Ok(self.rest_delete(table, &filters).await?)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> studyhub_core::Result<()> {
        self.storage_upload(bucket, path, data, content_type)
            .await
            .map_err(|e| match e {
                ClientError::Api { status, message } => CoreError::Storage(format!("{status}: {message}")),
                other => other.into(),
            })
    }

    async fn download(&self, bucket: &str, path: &str) -> studyhub_core::Result<Bytes> {
        self.storage_download(bucket, path)
            .await
            .map_err(|e| match e {
                ClientError::Api { status: 404, .. } => CoreError::not_found(bucket, path),
                ClientError::Api { status, message } => CoreError::Storage(format!("{status}: {message}")),
                other => other.into(),
            })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_public_url(bucket, path)
    }

    async fn subscribe(
        &self,
        table: &str,
        filter: Option<Filter>,
    ) -> studyhub_core::Result<Subscription> {
        self.ensure_fresh().await;
        let token = self.bearer();
        Ok(self.realtime.subscribe(table, filter, &token).await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> studyhub_core::Result<Session> {
        let session = self
            .auth_password_grant(email, password)
            .await
            .map_err(|e| auth_error(e, email))?;
        self.set_session(Some(session.clone()));
        tracing::info!(user = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> studyhub_core::Result<Session> {
        let session = self
            .auth_sign_up(email, password, full_name)
            .await
            .map_err(|e| auth_error(e, email))?;
        self.set_session(Some(session.clone()));
        tracing::info!(user = %session.user.id, "Signed up");
        Ok(session)
    }

    async fn sign_out(&self) -> studyhub_core::Result<()> {
        let result = self.auth_logout().await;
        // The local session goes away even if the server call failed.
        self.set_session(None);
        tracing::info!("Signed out");
        Ok(result?)
    }

    fn session(&self) -> Option<Session> {
        let session = self.session.read().clone()?;
        if session.is_expired(Utc::now()) && session.refresh_token.is_none() {
            return None;
        }
        Some(session)
    }

    fn restore(&self, session: Session) {
        tracing::debug!(user = %session.user.id, "Session restored");
        self.set_session(Some(session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_config() {
        let err = StudyHubClient::new(BackendConfig::new("", "key")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn test_bearer_prefers_session_token() {
        let client = StudyHubClient::new(BackendConfig::new("http://localhost:54321", "anon")).unwrap();
        assert_eq!(client.bearer(), "anon");
        client.restore(Session {
            access_token: "jwt".into(),
            refresh_token: None,
            expires_at: None,
            user: studyhub_core::AuthUser {
                id: uuid::Uuid::new_v4(),
                email: None,
            },
        });
        assert_eq!(client.bearer(), "jwt");
        assert!(client.session().is_some());
    }

    fn session_expiring_in(secs: i64, refresh_token: Option<&str>) -> Session {
        Session {
            access_token: "jwt".into(),
            refresh_token: refresh_token.map(String::from),
            expires_at: Some(Utc::now() + Duration::seconds(secs)),
            user: studyhub_core::AuthUser {
                id: uuid::Uuid::new_v4(),
                email: None,
            },
        }
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let client = StudyHubClient::new(BackendConfig::new("http://localhost:54321", "anon")).unwrap();
        assert!(!client.needs_refresh());

        client.restore(session_expiring_in(3600, Some("r")));
        assert!(!client.needs_refresh());

        client.restore(session_expiring_in(30, Some("r")));
        assert!(client.needs_refresh());

        client.restore(session_expiring_in(-7200, Some("r")));
        assert!(client.needs_refresh());

        // Nothing to refresh with.
        client.restore(session_expiring_in(-7200, None));
        assert!(!client.needs_refresh());
        assert!(client.session().is_none());
    }
}
