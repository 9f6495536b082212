//! Live chat inside a study group.

use std::collections::HashMap;

use dioxus::prelude::*;
use studyhub_core::model::{
    GroupMember, GroupMessage, GroupMessageType, NewGroupMessage, Profile, StudyGroup, tables,
};
use studyhub_core::query::{Direction, Filter, Query};
use studyhub_core::{ChangeKind, Database, Subscription};
use uuid::Uuid;

use super::{HookError, HookResult, profiles_by_id};
use crate::state::chat::GroupTranscript;
use crate::state::{AppContext, use_app};

#[derive(Debug, Clone)]
pub struct GroupChatService {
    db: Database,
    group_id: Uuid,
}

impl GroupChatService {
    pub fn new(db: Database, group_id: Uuid) -> Self {
        Self { db, group_id }
    }

    pub async fn fetch_group(&self) -> HookResult<StudyGroup> {
        let mut group: StudyGroup = self.db.get(self.group_id).await?;
        group.member_count = self
            .db
            .count(Query::table(tables::GROUP_MEMBERS).eq("group_id", self.group_id.to_string()))
            .await? as usize;
        Ok(group)
    }

    /// Members with their profiles, oldest membership first.
    pub async fn fetch_members(&self) -> HookResult<Vec<GroupMember>> {
        let mut members: Vec<GroupMember> = self
            .db
            .fetch(
                Query::table(tables::GROUP_MEMBERS)
                    .eq("group_id", self.group_id.to_string())
                    .order("joined_at", Direction::Ascending),
            )
            .await?;
        let mut profiles = profiles_by_id(&self.db, members.iter().map(|m| m.user_id)).await?;
        for m in &mut members {
            m.profile = profiles.remove(&m.user_id);
        }
        Ok(members)
    }

    /// Messages oldest first, with authors.
    pub async fn fetch_messages(&self) -> HookResult<Vec<GroupMessage>> {
        let mut messages: Vec<GroupMessage> = self
            .db
            .fetch(
                Query::table(tables::GROUP_MESSAGES)
                    .eq("group_id", self.group_id.to_string())
                    .order("created_at", Direction::Ascending),
            )
            .await?;
        let authors = profiles_by_id(&self.db, messages.iter().map(|m| m.user_id)).await?;
        for m in &mut messages {
            m.author = authors.get(&m.user_id).map(Profile::summary);
        }
        Ok(messages)
    }

    /// Post a text message.
    pub async fn send_message(&self, content: &str) -> HookResult<GroupMessage> {
        let user = self.db.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(HookError::Required("Message"));
        }
        let message = self
            .db
            .insert(&NewGroupMessage {
                group_id: self.group_id,
                user_id: user.id,
                content: content.to_string(),
                message_type: GroupMessageType::Text,
                file_url: None,
            })
            .await?;
        Ok(message)
    }

    /// Feed of messages posted to this group.
    pub async fn subscribe(&self) -> HookResult<Subscription> {
        Ok(self
            .db
            .subscribe::<GroupMessage>(Some(Filter::eq("group_id", self.group_id.to_string())))
            .await?)
    }

    /// Fill in the author of a message delivered by the feed.
    pub async fn with_author(
        &self,
        mut message: GroupMessage,
        known: &HashMap<Uuid, Profile>,
    ) -> GroupMessage {
        if let Some(profile) = known.get(&message.user_id) {
            message.author = Some(profile.summary());
            return message;
        }
        match self.db.get::<Profile>(message.user_id).await {
            Ok(profile) => message.author = Some(profile.summary()),
            Err(e) => tracing::debug!(user = %message.user_id, error = %e, "No profile for message author"),
        }
        message
    }
}

/// One group's chat mirrored into signals.
#[derive(Clone, Copy, PartialEq)]
pub struct UseGroupChat {
    app: AppContext,
    group_id: Uuid,
    pub group: Signal<Option<StudyGroup>>,
    pub members: Signal<Vec<GroupMember>>,
    pub transcript: Signal<GroupTranscript>,
    pub loading: Signal<bool>,
}

/// Load a group's chat and follow new messages while mounted.
pub fn use_group_chat(group_id: Uuid) -> UseGroupChat {
    let app = use_app();
    let group = use_signal(|| None);
    let members = use_signal(Vec::new);
    let transcript = use_signal(GroupTranscript::default);
    let loading = use_signal(|| true);
    let hook = UseGroupChat {
        app,
        group_id,
        group,
        members,
        transcript,
        loading,
    };
    use_effect(move || {
        spawn(async move { hook.run().await });
    });
    hook
}

impl UseGroupChat {
    fn service(&self) -> GroupChatService {
        GroupChatService::new(self.app.db(), self.group_id)
    }

    async fn load(&self) {
        let service = self.service();
        let (mut group, mut members, mut transcript, mut loading) =
            (self.group, self.members, self.transcript, self.loading);
        loading.set(true);
        match service.fetch_group().await {
            Ok(g) => group.set(Some(g)),
            Err(e) => {
                tracing::error!(group = %self.group_id, error = %e, "Error fetching group");
                self.app.toaster.error("Failed to load group", &e);
            }
        }
        match service.fetch_members().await {
            Ok(list) => members.set(list),
            Err(e) => tracing::error!(group = %self.group_id, error = %e, "Error fetching members"),
        }
        match service.fetch_messages().await {
            Ok(list) => transcript.write().replace(list),
            Err(e) => {
                tracing::error!(group = %self.group_id, error = %e, "Error fetching messages");
                self.app.toaster.error("Failed to load messages", &e);
            }
        }
        loading.set(false);
    }

    async fn run(&self) {
        self.load().await;
        let service = self.service();
        let mut feed = match service.subscribe().await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(group = %self.group_id, error = %e, "Live updates unavailable");
                return;
            }
        };
        let mut transcript = self.transcript;
        while let Some(event) = feed.recv().await {
            if event.kind != ChangeKind::Insert {
                continue;
            }
            let message = match event.decode::<GroupMessage>() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable group message");
                    continue;
                }
            };
            let known: HashMap<Uuid, Profile> = self
                .members
                .read()
                .iter()
                .filter_map(|m| m.profile.clone().map(|p| (m.user_id, p)))
                .collect();
            let message = service.with_author(message, &known).await;
            transcript.write().push(message);
        }
        tracing::debug!(group = %self.group_id, "Group message feed closed");
    }

    /// Send `content`; `true` when it was posted.
    pub async fn send(&self, content: String) -> bool {
        match self.service().send_message(&content).await {
            Ok(mut message) => {
                let me = self.app.user_id();
                message.author = self
                    .app
                    .profile
                    .read()
                    .as_ref()
                    .filter(|p| p.id == me)
                    .map(Profile::summary);
                let mut transcript = self.transcript;
                transcript.write().push(message);
                true
            }
            Err(HookError::Required(_)) => false,
            Err(e) => {
                tracing::error!(group = %self.group_id, error = %e, "Error sending message");
                self.app.toaster.error("Failed to send message", &e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhub_core::model::GroupRole;
    use crate::hooks::groups::{GroupDraft, GroupService};
    use crate::hooks::testing::{signed_in, switch_to};

    async fn group(db: &Database) -> Uuid {
        GroupService::new(db.clone())
            .create_group(GroupDraft {
                name: "CS 301 Study Group".into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_send_trims_and_rejects_empty() {
        let (db, _backend, me) = signed_in("Sarah Johnson").await;
        let service = GroupChatService::new(db.clone(), group(&db).await);
        assert!(matches!(
            service.send_message("   ").await,
            Err(HookError::Required("Message"))
        ));
        let sent = service.send_message("  hello group \n").await.unwrap();
        assert_eq!(sent.content, "hello group");
        assert_eq!(sent.message_type, GroupMessageType::Text);
        assert_eq!(sent.user_id, me);
    }

    #[tokio::test]
    async fn test_members_ordered_by_join_time() {
        let (db, backend, me) = signed_in("Sarah Johnson").await;
        let group_id = Uuid::new_v4();
        let late = Uuid::new_v4();
        backend.seed(
            tables::GROUP_MEMBERS,
            vec![
                serde_json::json!({
                    "id": Uuid::new_v4(), "group_id": group_id, "user_id": late,
                    "role": "member", "joined_at": "2024-05-03T09:00:00Z"
                }),
                serde_json::json!({
                    "id": Uuid::new_v4(), "group_id": group_id, "user_id": me,
                    "role": "admin", "joined_at": "2024-05-01T09:00:00Z"
                }),
            ],
        );
        let members = GroupChatService::new(db, group_id).fetch_members().await.unwrap();
        let order: Vec<_> = members.iter().map(|m| m.user_id).collect();
        assert_eq!(order, [me, late]);
        assert_eq!(members[0].role, GroupRole::Admin);
        assert!(members[0].profile.is_some());
        assert!(members[1].profile.is_none());
    }

    #[tokio::test]
    async fn test_members_and_messages_load_with_profiles() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        let group_id = group(&db).await;
        let service = GroupChatService::new(db.clone(), group_id);
        service.send_message("first").await.unwrap();

        switch_to(&backend, "Mike Chen").await;
        GroupService::new(db.clone()).join_group(group_id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.send_message("second").await.unwrap();

        let loaded = service.fetch_group().await.unwrap();
        assert_eq!(loaded.member_count, 2);

        let members = service.fetch_members().await.unwrap();
        let names: Vec<_> = members
            .iter()
            .map(|m| m.profile.as_ref().and_then(|p| p.full_name.clone()).unwrap_or_default())
            .collect();
        assert!(names.contains(&"Sarah Johnson".to_string()));
        assert!(names.contains(&"Mike Chen".to_string()));

        let messages = service.fetch_messages().await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
        assert_eq!(
            messages[1].author.as_ref().and_then(|a| a.full_name.as_deref()),
            Some("Mike Chen")
        );
    }

    #[tokio::test]
    async fn test_feed_delivers_only_this_group() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let mine = group(&db).await;
        let other = group(&db).await;
        let service = GroupChatService::new(db.clone(), mine);
        let mut feed = service.subscribe().await.unwrap();

        GroupChatService::new(db.clone(), other).send_message("elsewhere").await.unwrap();
        service.send_message("here").await.unwrap();

        let event = feed.recv().await.unwrap();
        let message: GroupMessage = event.decode().unwrap();
        assert_eq!(message.content, "here");

        let message = service.with_author(message, &HashMap::new()).await;
        assert_eq!(message.author.unwrap().full_name.as_deref(), Some("Sarah Johnson"));
    }
}
