//! In-memory [`Backend`] implementation.
//!
//! Mirrors the behaviour StudyHub relies on from the hosted service: ids and
//! timestamps assigned on insert, a `profiles` row created on sign-up, and a
//! change feed for every mutation. Used by tests and the offline demo.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::backend::{AuthUser, Backend, ChangeEvent, ChangeKind, Session, Subscription};
use crate::error::{CoreError, Result};
use crate::model::tables;
use crate::query::{Filter, Query};

/// Capacity of the shared change feed.
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Minimum password length accepted on sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: String,
}

/// In-memory backend for testing and offline use.
pub struct InMemoryBackend {
    tables: DashMap<String, Vec<Value>>,
    objects: DashMap<(String, String), Bytes>,
    accounts: DashMap<String, Account>,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("tables", &self.tables.len())
            .field("objects", &self.objects.len())
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: DashMap::new(),
            objects: DashMap::new(),
            accounts: DashMap::new(),
            session: RwLock::new(None),
            changes,
        }
    }

    /// Put rows into a table as-is, without emitting change events.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Number of rows currently stored in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.len()).unwrap_or(0)
    }

    /// Whether an object exists in storage.
    pub fn has_object(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .contains_key(&(bucket.to_string(), path.to_string()))
    }

    fn emit(&self, table: &str, kind: ChangeKind, record: Value, old_record: Option<Value>) {
        // No receivers is fine.
        let _ = self.changes.send(ChangeEvent {
            table: table.to_string(),
            kind,
            record,
            old_record,
            topic: None,
        });
    }

    fn open_session(&self, account: &Account) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().simple().to_string(),
            refresh_token: Some(Uuid::new_v4().simple().to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            user: AuthUser {
                id: account.id,
                email: Some(account.email.clone()),
            },
        };
        *self.session.write() = Some(session.clone());
        session
    }

    fn stamp(mut row: Map<String, Value>) -> Map<String, Value> {
        let now = now_text();
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(now.clone()));
        row.entry("updated_at").or_insert_with(|| Value::String(now));
        row
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn select(&self, query: Query) -> Result<Vec<Value>> {
        let rows = self
            .tables
            .get(&query.table)
            .map(|t| t.clone())
            .unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn count(&self, query: Query) -> Result<u64> {
        let count = self
            .tables
            .get(&query.table)
            .map(|t| t.iter().filter(|row| query.matches(row)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(map) = row else {
                return Err(CoreError::Validation(format!(
                    "insert into {table} expects JSON objects"
                )));
            };
            stored.push(Value::Object(Self::stamp(map)));
        }

        {
            let mut entry = self.tables.entry(table.to_string()).or_default();
            for row in &stored {
                let id = &row["id"];
                if entry.iter().any(|existing| &existing["id"] == id) {
                    return Err(CoreError::Backend {
                        status: 409,
                        message: format!("duplicate key value violates unique constraint on {table}.id"),
                    });
                }
            }
            entry.extend(stored.iter().cloned());
        }

        for row in &stored {
            self.emit(table, ChangeKind::Insert, row.clone(), None);
        }
        tracing::trace!(table, rows = stored.len(), "memory insert");
        Ok(stored)
    }

    async fn update(&self, table: &str, filters: Vec<Filter>, patch: Value) -> Result<Vec<Value>> {
        let Value::Object(patch) = patch else {
            return Err(CoreError::Validation(format!(
                "update of {table} expects a JSON object"
            )));
        };

        let mut changed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(table) {
            let now = now_text();
            for row in rows.iter_mut() {
                if !filters.iter().all(|f| f.matches(row)) {
                    continue;
                }
                let old = row.clone();
                if let Value::Object(map) = row {
                    for (k, v) in &patch {
                        map.insert(k.clone(), v.clone());
                    }
                    if map.contains_key("updated_at") && !patch.contains_key("updated_at") {
                        map.insert("updated_at".to_string(), Value::String(now.clone()));
                    }
                }
                changed.push((old, row.clone()));
            }
        }

        for (old, new) in &changed {
            self.emit(table, ChangeKind::Update, new.clone(), Some(old.clone()));
        }
        Ok(changed.into_iter().map(|(_, new)| new).collect())
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<u64> {
        let mut removed = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(table) {
            rows.retain(|row| {
                if filters.iter().all(|f| f.matches(row)) {
                    removed.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }
        for row in &removed {
            self.emit(table, ChangeKind::Delete, Value::Object(Map::new()), Some(row.clone()));
        }
        Ok(removed.len() as u64)
    }

    async fn upload(&self, bucket: &str, path: &str, data: Bytes, _content_type: &str) -> Result<()> {
        let key = (bucket.to_string(), path.to_string());
        if self.objects.contains_key(&key) {
            return Err(CoreError::Storage(format!("object {bucket}/{path} already exists")));
        }
        self.objects.insert(key, data);
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes> {
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|b| b.clone())
            .ok_or_else(|| CoreError::Storage(format!("object {bucket}/{path} not found")))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }

    async fn subscribe(&self, table: &str, filter: Option<Filter>) -> Result<Subscription> {
        Ok(Subscription::new(table, filter, self.changes.subscribe()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let key = email.trim().to_lowercase();
        let account = self
            .accounts
            .get(&key)
            .filter(|a| a.password == password)
            .map(|a| a.clone())
            .ok_or(CoreError::InvalidCredentials)?;
        Ok(self.open_session(&account))
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let key = email.trim().to_lowercase();
        if !key.contains('@') {
            return Err(CoreError::Validation(format!("invalid e-mail address: {email}")));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.accounts.contains_key(&key) {
            return Err(CoreError::AlreadyRegistered { email: key });
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: key.clone(),
            password: password.to_string(),
        };
        self.accounts.insert(key.clone(), account.clone());

        let name = full_name.trim();
        let profile = serde_json::json!({
            "id": account.id.to_string(),
            "full_name": if name.is_empty() { Value::Null } else { Value::String(name.to_string()) },
            "email": key,
            "role": "student",
        });
        self.insert(tables::PROFILES, vec![profile]).await?;

        Ok(self.open_session(&account))
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.write().take();
        Ok(())
    }

    fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn restore(&self, session: Session) {
        *self.session.write() = Some(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let backend = InMemoryBackend::new();
        let rows = backend
            .insert("files", vec![json!({"title": "Networks"})])
            .await
            .unwrap();
        let row = &rows[0];
        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].is_string());
        assert_eq!(backend.row_count("files"), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let backend = InMemoryBackend::new();
        backend.insert("t", vec![json!({"id": "same"})]).await.unwrap();
        let err = backend.insert("t", vec![json!({"id": "same"})]).await.unwrap_err();
        assert!(matches!(err, CoreError::Backend { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_emit_changes() {
        let backend = InMemoryBackend::new();
        let mut sub = backend.subscribe("files", None).await.unwrap();

        let stored = backend
            .insert("files", vec![json!({"title": "a", "download_count": 0})])
            .await
            .unwrap();
        let id = stored[0]["id"].clone();

        let updated = backend
            .update("files", vec![Filter::eq("id", id.clone())], json!({"download_count": 1}))
            .await
            .unwrap();
        assert_eq!(updated[0]["download_count"], 1);

        let deleted = backend.delete("files", vec![Filter::eq("id", id)]).await.unwrap();
        assert_eq!(deleted, 1);

        let kinds: Vec<ChangeKind> = vec![
            sub.recv().await.unwrap().kind,
            sub.recv().await.unwrap().kind,
            sub.recv().await.unwrap().kind,
        ];
        assert_eq!(kinds, vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }

    #[tokio::test]
    async fn test_select_and_count() {
        let backend = InMemoryBackend::new();
        backend.seed(
            "discussions",
            vec![
                json!({"id": "1", "course": "CS", "created_at": "2024-01-01T00:00:00Z"}),
                json!({"id": "2", "course": "MATH", "created_at": "2024-01-02T00:00:00Z"}),
                json!({"id": "3", "course": "CS", "created_at": "2024-01-03T00:00:00Z"}),
            ],
        );
        let rows = backend
            .select(
                Query::table("discussions")
                    .eq("course", "CS")
                    .order("created_at", Direction::Descending),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], "3");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            backend.count(Query::table("discussions").eq("course", "CS").limit(1)).await.unwrap(),
            2
        );
        assert_eq!(backend.count(Query::table("nothing")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_auth_flow() {
        let backend = InMemoryBackend::new();
        assert!(backend.session().is_none());

        let session = backend
            .sign_up("Emma@Uni.edu", "secret1", "Emma Wilson")
            .await
            .unwrap();
        assert_eq!(session.user.email.as_deref(), Some("emma@uni.edu"));
        assert_eq!(backend.row_count(tables::PROFILES), 1);

        let dup = backend.sign_up("emma@uni.edu", "secret1", "Emma").await;
        assert!(matches!(dup, Err(CoreError::AlreadyRegistered { .. })));

        backend.sign_out().await.unwrap();
        assert!(backend.session().is_none());

        assert!(matches!(
            backend.sign_in("emma@uni.edu", "wrong").await,
            Err(CoreError::InvalidCredentials)
        ));
        let again = backend.sign_in("emma@uni.edu", "secret1").await.unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.sign_up("no-at-sign", "secret1", "x").await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            backend.sign_up("a@b.c", "123", "x").await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_roundtrip() {
        let backend = InMemoryBackend::new();
        backend
            .upload("lecture-files", "lecture-files/1.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();
        assert!(backend.has_object("lecture-files", "lecture-files/1.pdf"));
        assert!(
            backend
                .upload("lecture-files", "lecture-files/1.pdf", Bytes::new(), "application/pdf")
                .await
                .is_err()
        );
        let data = backend.download("lecture-files", "lecture-files/1.pdf").await.unwrap();
        assert_eq!(&data[..], b"%PDF");
        assert!(backend.download("lecture-files", "missing").await.is_err());
    }
}
