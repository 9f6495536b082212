//! Study groups and memberships.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use dioxus::prelude::*;
use studyhub_core::model::{GroupMember, GroupRole, NewGroup, NewGroupMember, StudyGroup, tables};
use studyhub_core::query::{Direction, Filter, Query};
use studyhub_core::{CoreError, Database};
use uuid::Uuid;

use super::{HookError, HookResult, non_blank, required};
use crate::state::{AppContext, use_app};

/// Form input for a new group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDraft {
    pub name: String,
    pub description: Option<String>,
    pub course: Option<String>,
    pub is_private: bool,
    pub max_members: Option<u32>,
}

/// Groups whose name, description or course contain `query`.
pub fn filter_groups(groups: &[StudyGroup], query: &str) -> Vec<StudyGroup> {
    let needle = query.trim().to_lowercase();
    groups
        .iter()
        .filter(|g| {
            needle.is_empty()
                || g.name.to_lowercase().contains(&needle)
                || g.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
                || g.course.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
pub struct GroupService {
    db: Database,
}

impl GroupService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All groups, newest first, with member counts.
    pub async fn fetch_groups(&self) -> HookResult<Vec<StudyGroup>> {
        let mut groups: Vec<StudyGroup> = self
            .db
            .fetch(Query::table(tables::STUDY_GROUPS).order("created_at", Direction::Descending))
            .await?;
        if groups.is_empty() {
            return Ok(groups);
        }
        let members: Vec<GroupMember> = self
            .db
            .fetch(
                Query::table(tables::GROUP_MEMBERS)
                    .in_("group_id", groups.iter().map(|g| g.id.to_string())),
            )
            .await?;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for m in &members {
            *counts.entry(m.group_id).or_default() += 1;
        }
        for g in &mut groups {
            g.member_count = counts.get(&g.id).copied().unwrap_or(0);
        }
        Ok(groups)
    }

    /// Create a group with the caller as its admin.
    pub async fn create_group(&self, draft: GroupDraft) -> HookResult<StudyGroup> {
        let user = self.db.require_user()?;
        let name = required(&draft.name, "Group name")?;
        if draft.max_members == Some(0) {
            return Err(CoreError::Validation("Maximum members must be at least 1".into()).into());
        }
        let mut group: StudyGroup = self
            .db
            .insert(&NewGroup {
                name,
                description: non_blank(draft.description),
                course: non_blank(draft.course),
                is_private: draft.is_private,
                max_members: draft.max_members,
                created_by: user.id,
            })
            .await?;
        let _: GroupMember = self
            .db
            .insert(&NewGroupMember {
                group_id: group.id,
                user_id: user.id,
                role: GroupRole::Admin,
                joined_at: Utc::now(),
            })
            .await?;
        group.member_count = 1;
        tracing::info!(group = %group.id, name = %group.name, "Study group created");
        Ok(group)
    }

    async fn membership(&self, group_id: Uuid, user_id: Uuid) -> HookResult<Option<GroupMember>> {
        Ok(self
            .db
            .fetch_optional(
                Query::table(tables::GROUP_MEMBERS)
                    .eq("group_id", group_id.to_string())
                    .eq("user_id", user_id.to_string()),
            )
            .await?)
    }

    /// Join a group as a regular member.
    pub async fn join_group(&self, group_id: Uuid) -> HookResult<GroupMember> {
        let user = self.db.require_user()?;
        if self.membership(group_id, user.id).await?.is_some() {
            return Err(HookError::AlreadyMember);
        }
        let mut group: StudyGroup = self.db.get(group_id).await?;
        group.member_count = self
            .db
            .count(Query::table(tables::GROUP_MEMBERS).eq("group_id", group_id.to_string()))
            .await? as usize;
        if group.is_full() {
            return Err(CoreError::GroupFull.into());
        }
        let member = self
            .db
            .insert(&NewGroupMember {
                group_id,
                user_id: user.id,
                role: GroupRole::Member,
                joined_at: Utc::now(),
            })
            .await?;
        tracing::info!(group = %group_id, user = %user.id, "Joined study group");
        Ok(member)
    }

    pub async fn leave_group(&self, group_id: Uuid) -> HookResult<()> {
        let user = self.db.require_user()?;
        let removed = self
            .db
            .delete::<GroupMember>(vec![
                Filter::eq("group_id", group_id.to_string()),
                Filter::eq("user_id", user.id.to_string()),
            ])
            .await?;
        tracing::info!(group = %group_id, user = %user.id, removed, "Left study group");
        Ok(())
    }

    /// Ids of the groups the signed-in user belongs to.
    pub async fn my_group_ids(&self) -> HookResult<HashSet<Uuid>> {
        let user = self.db.require_user()?;
        let rows: Vec<GroupMember> = self
            .db
            .fetch(Query::table(tables::GROUP_MEMBERS).eq("user_id", user.id.to_string()))
            .await?;
        Ok(rows.into_iter().map(|m| m.group_id).collect())
    }
}

/// Study groups mirrored into signals.
#[derive(Clone, Copy, PartialEq)]
pub struct UseGroups {
    app: AppContext,
    pub groups: Signal<Vec<StudyGroup>>,
    pub mine: Signal<HashSet<Uuid>>,
    pub loading: Signal<bool>,
}

pub fn use_groups() -> UseGroups {
    let app = use_app();
    let groups = use_signal(Vec::new);
    let mine = use_signal(HashSet::new);
    let loading = use_signal(|| true);
    let hook = UseGroups {
        app,
        groups,
        mine,
        loading,
    };
    use_effect(move || hook.refresh());
    hook
}

impl UseGroups {
    fn service(&self) -> GroupService {
        GroupService::new(self.app.db())
    }

    pub fn refresh(&self) {
        let hook = *self;
        spawn(async move { hook.reload().await });
    }

    async fn reload(&self) {
        let (mut groups, mut mine, mut loading) = (self.groups, self.mine, self.loading);
        loading.set(true);
        let service = self.service();
        match service.fetch_groups().await {
            Ok(list) => groups.set(list),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching groups");
                self.app.toaster.error("Failed to load groups", &e);
            }
        }
        match service.my_group_ids().await {
            Ok(ids) => mine.set(ids),
            Err(e) => tracing::warn!(error = %e, "Error fetching memberships"),
        }
        loading.set(false);
    }

    pub fn is_member(&self, group_id: Uuid) -> bool {
        self.mine.read().contains(&group_id)
    }

    /// Groups the signed-in user belongs to.
    pub fn joined(&self) -> Vec<StudyGroup> {
        let mine = self.mine.read();
        self.groups
            .read()
            .iter()
            .filter(|g| mine.contains(&g.id))
            .cloned()
            .collect()
    }

    pub async fn create(&self, draft: GroupDraft) -> bool {
        match self.service().create_group(draft).await {
            Ok(_) => {
                self.app.toaster.success("Study group created successfully");
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating group");
                self.app.toaster.error("Failed to create group", &e);
                false
            }
        }
    }

    pub async fn join(&self, group_id: Uuid) {
        match self.service().join_group(group_id).await {
            Ok(_) => {
                self.app.toaster.success("Joined study group");
                self.reload().await;
            }
            Err(e) => self.app.toaster.error("Could not join group", &e),
        }
    }

    pub async fn leave(&self, group_id: Uuid) {
        match self.service().leave_group(group_id).await {
            Ok(()) => {
                self.app.toaster.success("Left study group");
                self.reload().await;
            }
            Err(e) => self.app.toaster.error("Could not leave group", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::{signed_in, switch_to};

    fn draft(name: &str, max: Option<u32>) -> GroupDraft {
        GroupDraft {
            name: name.to_string(),
            description: Some("Weekly sessions".to_string()),
            course: Some("CS 301".to_string()),
            is_private: false,
            max_members: max,
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_admin() {
        let (db, _backend, me) = signed_in("Sarah Johnson").await;
        let service = GroupService::new(db.clone());
        let group = service.create_group(draft("Networks", Some(5))).await.unwrap();
        assert_eq!(group.member_count, 1);

        let members: Vec<GroupMember> = db
            .fetch(Query::table(tables::GROUP_MEMBERS).eq("group_id", group.id.to_string()))
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, me);
        assert_eq!(members[0].role, GroupRole::Admin);
        assert!(service.my_group_ids().await.unwrap().contains(&group.id));
    }

    #[tokio::test]
    async fn test_join_refuses_duplicates_and_full_groups() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        let service = GroupService::new(db);
        let group = service.create_group(draft("Pair", Some(2))).await.unwrap();

        assert!(matches!(
            service.join_group(group.id).await,
            Err(HookError::AlreadyMember)
        ));

        switch_to(&backend, "Mike Chen").await;
        service.join_group(group.id).await.unwrap();

        switch_to(&backend, "Emma Wilson").await;
        assert!(matches!(
            service.join_group(group.id).await,
            Err(HookError::Core(CoreError::GroupFull))
        ));

        let groups = service.fetch_groups().await.unwrap();
        assert_eq!(groups[0].member_count, 2);
        assert!(groups[0].is_full());
    }

    #[tokio::test]
    async fn test_leave_group() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        let service = GroupService::new(db);
        let group = service.create_group(draft("Algebra", None)).await.unwrap();
        switch_to(&backend, "Mike Chen").await;
        service.join_group(group.id).await.unwrap();
        service.leave_group(group.id).await.unwrap();
        assert!(service.my_group_ids().await.unwrap().is_empty());
        assert_eq!(service.fetch_groups().await.unwrap()[0].member_count, 1);
    }

    #[tokio::test]
    async fn test_validation() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let service = GroupService::new(db);
        assert!(matches!(
            service.create_group(draft("  ", None)).await,
            Err(HookError::Required(_))
        ));
        assert!(matches!(
            service.create_group(draft("Zero", Some(0))).await,
            Err(HookError::Core(CoreError::Validation(_)))
        ));
        assert!(service.fetch_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_groups_and_order() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let service = GroupService::new(db);
        service.create_group(draft("Networks", None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut maths = draft("Linear Algebra", None);
        maths.course = Some("MATH 201".into());
        maths.description = None;
        service.create_group(maths).await.unwrap();

        let groups = service.fetch_groups().await.unwrap();
        assert_eq!(groups[0].name, "Linear Algebra");
        assert_eq!(filter_groups(&groups, "math").len(), 1);
        assert_eq!(filter_groups(&groups, "weekly").len(), 1);
        assert_eq!(filter_groups(&groups, "").len(), 2);
    }
}
