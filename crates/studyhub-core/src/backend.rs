//! The seam to the hosted backend.
//!
//! Everything StudyHub persists goes through [`Backend`]: table CRUD,
//! object storage, auth sessions and realtime change feeds. The trait
//! speaks JSON rows; [`Database`] layers typed access on top.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::model::Table;
use crate::query::{Filter, Query};

/// The authenticated user behind a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// An auth session issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Kind of row change delivered by a realtime subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change on a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// New row (empty object for deletes).
    pub record: Value,
    /// Previous row when the backend provides it.
    pub old_record: Option<Value>,
    /// Channel the event arrived on, for backends that multiplex one feed.
    pub topic: Option<String>,
}

impl ChangeEvent {
    /// The row the event is about.
    pub fn row(&self) -> &Value {
        match (self.kind, &self.old_record) {
            (ChangeKind::Delete, Some(old)) => old,
            _ => &self.record,
        }
    }

    /// Decode the affected row.
    pub fn decode<T: Table>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.row().clone())?)
    }
}

/// A live feed of changes for one table.
///
/// Dropping the subscription releases whatever the backend holds for it.
pub struct Subscription {
    table: String,
    filter: Option<Filter>,
    topic: Option<String>,
    rx: broadcast::Receiver<ChangeEvent>,
    _guard: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("filter", &self.filter)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn new(
        table: impl Into<String>,
        filter: Option<Filter>,
        rx: broadcast::Receiver<ChangeEvent>,
    ) -> Self {
        Self {
            table: table.into(),
            filter,
            topic: None,
            rx,
            _guard: None,
        }
    }

    /// Only accept events tagged with `topic`.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Keep `guard` alive as long as the subscription.
    pub fn with_guard(mut self, guard: impl Send + Sync + 'static) -> Self {
        self._guard = Some(Box::new(guard));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        event.table == self.table
            && self.topic.as_ref().is_none_or(|t| event.topic.as_ref() == Some(t))
            && self.filter.as_ref().is_none_or(|f| f.matches(event.row()))
    }

    /// Next matching event, or `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(table = %self.table, skipped, "Realtime subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Request/response and subscription interface of the hosted backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Rows matching the query.
    async fn select(&self, query: Query) -> Result<Vec<Value>>;

    /// Exact number of rows matching the query filters.
    async fn count(&self, query: Query) -> Result<u64>;

    /// Insert rows and return them as stored.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    /// Patch rows matching every filter and return them.
    async fn update(&self, table: &str, filters: Vec<Filter>, patch: Value) -> Result<Vec<Value>>;

    /// Delete rows matching every filter, returning how many went away.
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<u64>;

    /// Store an object.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Fetch an object.
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes>;

    /// Public URL of an object.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Subscribe to changes of a table, optionally narrowed by a filter.
    async fn subscribe(&self, table: &str, filter: Option<Filter>) -> Result<Subscription>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// Session currently attached to requests.
    fn session(&self) -> Option<Session>;

    /// Attach a previously persisted session.
    fn restore(&self, session: Session);
}

/// Typed access to a [`Backend`].
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }
}

impl Database {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.backend.session().map(|s| s.user)
    }

    /// The signed-in user or [`CoreError::NotAuthenticated`].
    pub fn require_user(&self) -> Result<AuthUser> {
        self.current_user().ok_or(CoreError::NotAuthenticated)
    }

    /// Rows of `T` matching `query`.
    pub async fn fetch<T: Table>(&self, query: Query) -> Result<Vec<T>> {
        debug_assert_eq!(query.table, T::NAME);
        let rows = self.backend.select(query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .collect()
    }

    /// First row of `T` matching `query`.
    pub async fn fetch_optional<T: Table>(&self, query: Query) -> Result<Option<T>> {
        Ok(self.fetch(query.limit(1)).await?.into_iter().next())
    }

    /// Row of `T` with the given id.
    pub async fn get<T: Table>(&self, id: Uuid) -> Result<T> {
        self.fetch_optional(Query::table(T::NAME).eq("id", id.to_string()))
            .await?
            .ok_or_else(|| CoreError::not_found(T::NAME, id))
    }

    pub async fn count(&self, query: Query) -> Result<u64> {
        self.backend.count(query).await
    }

    /// Insert one payload into `T`'s table and decode the stored row.
    pub async fn insert<T: Table, P: Serialize>(&self, payload: &P) -> Result<T> {
        let row = serde_json::to_value(payload)?;
        let stored = self.backend.insert(T::NAME, vec![row]).await?;
        let first = stored.into_iter().next().ok_or_else(|| CoreError::Backend {
            status: 500,
            message: format!("insert into {} returned no row", T::NAME),
        })?;
        Ok(serde_json::from_value(first)?)
    }

    /// Insert many payloads into `T`'s table.
    pub async fn insert_many<T: Table, P: Serialize>(&self, payloads: &[P]) -> Result<Vec<T>> {
        let rows = payloads
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let stored = self.backend.insert(T::NAME, rows).await?;
        stored
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .collect()
    }

    /// Patch rows of `T` matching `filters`.
    pub async fn update<T: Table, P: Serialize>(&self, filters: Vec<Filter>, patch: &P) -> Result<Vec<T>> {
        let patch = serde_json::to_value(patch)?;
        let rows = self.backend.update(T::NAME, filters, patch).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .collect()
    }

    pub async fn delete<T: Table>(&self, filters: Vec<Filter>) -> Result<u64> {
        self.backend.delete(T::NAME, filters).await
    }

    pub async fn subscribe<T: Table>(&self, filter: Option<Filter>) -> Result<Subscription> {
        self.backend.subscribe(T::NAME, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: ChangeKind, record: Value, old: Option<Value>) -> ChangeEvent {
        ChangeEvent {
            table: "messages".to_string(),
            kind,
            record,
            old_record: old,
            topic: None,
        }
    }

    #[test]
    fn test_delete_event_uses_old_record() {
        let ev = event(ChangeKind::Delete, json!({}), Some(json!({"id": "x"})));
        assert_eq!(ev.row()["id"], "x");
        let ev = event(ChangeKind::Insert, json!({"id": "y"}), None);
        assert_eq!(ev.row()["id"], "y");
    }

    #[tokio::test]
    async fn test_subscription_filters_events() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = Subscription::new("messages", Some(Filter::eq("conversation_id", "c1")), rx);

        tx.send(event(ChangeKind::Insert, json!({"conversation_id": "c2"}), None)).unwrap();
        tx.send(ChangeEvent {
            table: "files".to_string(),
            kind: ChangeKind::Insert,
            record: json!({"conversation_id": "c1"}),
            old_record: None,
            topic: None,
        })
        .unwrap();
        tx.send(event(ChangeKind::Insert, json!({"conversation_id": "c1", "id": 7}), None)).unwrap();
        drop(tx);

        let got = sub.recv().await.unwrap();
        assert_eq!(got.record["id"], 7);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_topic_bound_subscription_ignores_other_topics() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = Subscription::new("messages", None, rx).with_topic("realtime:messages:2");

        let tagged = |topic: &str, id: i64| ChangeEvent {
            topic: Some(topic.to_string()),
            ..event(ChangeKind::Insert, json!({"id": id}), None)
        };
        tx.send(tagged("realtime:messages:1", 1)).unwrap();
        tx.send(event(ChangeKind::Insert, json!({"id": 2}), None)).unwrap();
        tx.send(tagged("realtime:messages:2", 3)).unwrap();
        drop(tx);

        assert_eq!(sub.recv().await.unwrap().record["id"], 3);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_survives_lag() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = Subscription::new("messages", None, rx);
        for i in 0..5 {
            tx.send(event(ChangeKind::Insert, json!({"n": i}), None)).unwrap();
        }
        let got = sub.recv().await.unwrap();
        assert_eq!(got.record["n"], 3);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(now),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: None,
            },
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(5)));
    }
}
