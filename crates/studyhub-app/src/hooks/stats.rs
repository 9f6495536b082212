//! Dashboard and profile counters.

use std::collections::HashMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use dioxus::prelude::*;
use futures::try_join;
use studyhub_core::Database;
use studyhub_core::model::{GroupMessage, tables};
use studyhub_core::query::Query;
use uuid::Uuid;

use super::HookResult;
use crate::state::format::ActivityLevel;
use crate::state::{AppContext, use_app};

/// Window counted as "recent".
const RECENT_DAYS: i64 = 7;

/// Platform-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_files: u64,
    pub total_discussions: u64,
    pub total_groups: u64,
    /// Files, discussions and group messages created in the last week.
    pub recent_activity: u64,
}

/// Contributions of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub files_uploaded: u64,
    pub questions_asked: u64,
    pub answers_given: u64,
    pub groups_joined: u64,
}

fn week_ago(now: DateTime<Utc>) -> String {
    (now - Duration::days(RECENT_DAYS)).to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone)]
pub struct StatsService {
    db: Database,
}

impl StatsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn global(&self, now: DateTime<Utc>) -> HookResult<GlobalStats> {
        let since = week_ago(now);
        let recent = |table: &str| Query::table(table).gte("created_at", since.clone());
        let (total_files, total_discussions, total_groups, recent_files, recent_discussions, recent_messages) = try_join!(
            self.db.count(Query::table(tables::FILES)),
            self.db.count(Query::table(tables::DISCUSSIONS)),
            self.db.count(Query::table(tables::STUDY_GROUPS)),
            self.db.count(recent(tables::FILES)),
            self.db.count(recent(tables::DISCUSSIONS)),
            self.db.count(recent(tables::GROUP_MESSAGES)),
        )?;
        Ok(GlobalStats {
            total_files,
            total_discussions,
            total_groups,
            recent_activity: recent_files + recent_discussions + recent_messages,
        })
    }

    pub async fn for_user(&self, user_id: Uuid) -> HookResult<UserStats> {
        let by_user = |table: &str| Query::table(table).eq("user_id", user_id.to_string());
        let (files_uploaded, questions_asked, answers_given, groups_joined) = try_join!(
            self.db.count(by_user(tables::FILES)),
            self.db.count(by_user(tables::DISCUSSIONS)),
            self.db.count(by_user(tables::DISCUSSION_REPLIES)),
            self.db.count(by_user(tables::GROUP_MEMBERS)),
        )?;
        Ok(UserStats {
            files_uploaded,
            questions_asked,
            answers_given,
            groups_joined,
        })
    }

    /// Activity badge per group from last week's message count.
    pub async fn group_activity(
        &self,
        group_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> HookResult<HashMap<Uuid, ActivityLevel>> {
        if group_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let messages: Vec<GroupMessage> = self
            .db
            .fetch(
                Query::table(tables::GROUP_MESSAGES)
                    .in_("group_id", group_ids.iter().map(Uuid::to_string))
                    .gte("created_at", week_ago(now))
                    .columns(&["id", "group_id", "user_id", "created_at"]),
            )
            .await?;
        let mut counts: HashMap<Uuid, u64> = group_ids.iter().map(|id| (*id, 0)).collect();
        for m in &messages {
            *counts.entry(m.group_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(id, n)| (id, ActivityLevel::from_weekly_messages(n)))
            .collect())
    }
}

/// Counters for the dashboard and profile pages.
#[derive(Clone, Copy, PartialEq)]
pub struct UseStats {
    app: AppContext,
    pub global: Signal<GlobalStats>,
    pub user: Signal<UserStats>,
    pub loading: Signal<bool>,
}

pub fn use_stats() -> UseStats {
    let app = use_app();
    let global = use_signal(GlobalStats::default);
    let user = use_signal(UserStats::default);
    let loading = use_signal(|| true);
    let hook = UseStats {
        app,
        global,
        user,
        loading,
    };
    use_effect(move || hook.refresh());
    hook
}

impl UseStats {
    pub fn refresh(&self) {
        let hook = *self;
        spawn(async move { hook.reload().await });
    }

    async fn reload(&self) {
        let service = StatsService::new(self.app.db());
        let (mut global, mut user, mut loading) = (self.global, self.user, self.loading);
        loading.set(true);
        match service.global(Utc::now()).await {
            Ok(stats) => global.set(stats),
            Err(e) => tracing::error!(error = %e, "Error fetching stats"),
        }
        match service.for_user(self.app.user_id()).await {
            Ok(stats) => user.set(stats),
            Err(e) => tracing::error!(error = %e, "Error fetching user stats"),
        }
        loading.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::signed_in;
    use serde_json::json;
    use studyhub_core::Backend;

    fn stamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    #[tokio::test]
    async fn test_global_counts_recent_activity() {
        let (db, backend, me) = signed_in("Sarah Johnson").await;
        let now = Utc::now();
        let old = stamp(now - Duration::days(30));
        let fresh = stamp(now - Duration::hours(2));
        let group = Uuid::new_v4();

        backend
            .insert(
                tables::FILES,
                vec![
                    json!({"title": "Old", "file_name": "a.pdf", "file_path": "p/a", "file_type": "document", "user_id": me, "created_at": old}),
                    json!({"title": "New", "file_name": "b.pdf", "file_path": "p/b", "file_type": "document", "user_id": me, "created_at": fresh}),
                ],
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::DISCUSSIONS,
                vec![json!({"title": "Q", "content": "?", "user_id": me, "created_at": fresh})],
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::STUDY_GROUPS,
                vec![json!({"id": group, "name": "G", "created_by": me, "created_at": old})],
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::GROUP_MESSAGES,
                (0..4)
                    .map(|_| json!({"group_id": group, "user_id": me, "content": "hi", "created_at": fresh}))
                    .collect(),
            )
            .await
            .unwrap();

        let service = StatsService::new(db);
        let stats = service.global(now).await.unwrap();
        assert_eq!(
            stats,
            GlobalStats {
                total_files: 2,
                total_discussions: 1,
                total_groups: 1,
                recent_activity: 6,
            }
        );

        let quiet = Uuid::new_v4();
        let activity = service.group_activity(&[group, quiet], now).await.unwrap();
        assert_eq!(activity[&group], ActivityLevel::Medium);
        assert_eq!(activity[&quiet], ActivityLevel::Low);
    }

    #[tokio::test]
    async fn test_user_stats() {
        let (db, backend, me) = signed_in("Sarah Johnson").await;
        let other = Uuid::new_v4();
        let discussion = Uuid::new_v4();
        backend
            .insert(
                tables::DISCUSSIONS,
                vec![
                    json!({"id": discussion, "title": "Q", "content": "?", "user_id": me}),
                    json!({"title": "Q2", "content": "?", "user_id": other}),
                ],
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::DISCUSSION_REPLIES,
                vec![
                    json!({"discussion_id": discussion, "content": "a", "user_id": me}),
                    json!({"discussion_id": discussion, "content": "b", "user_id": me}),
                ],
            )
            .await
            .unwrap();
        backend
            .insert(
                tables::GROUP_MEMBERS,
                vec![json!({"group_id": Uuid::new_v4(), "user_id": me, "role": "member"})],
            )
            .await
            .unwrap();

        let stats = StatsService::new(db).for_user(me).await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                files_uploaded: 0,
                questions_asked: 1,
                answers_given: 2,
                groups_joined: 1,
            }
        );
    }
}
