//! Direct and group conversations between users.

use std::collections::{HashMap, HashSet};

use chrono::{SecondsFormat, Utc};
use dioxus::prelude::*;
use serde_json::json;
use studyhub_core::model::{
    ChatMessage, Conversation, ConversationParticipant, NewChatMessage, NewConversation,
    NewParticipant, Profile, tables,
};
use studyhub_core::query::{Direction, Filter, Query};
use studyhub_core::{ChangeKind, CoreError, Database, Subscription};
use uuid::Uuid;

use super::{HookError, HookResult, non_blank, profiles_by_id};
use crate::state::chat::{ChatState, InsertOutcome};
use crate::state::{AppContext, use_app};

#[derive(Debug, Clone)]
pub struct ChatService {
    db: Database,
}

impl ChatService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn conversation_ids_of(&self, user_id: Uuid) -> HookResult<HashSet<Uuid>> {
        let rows: Vec<ConversationParticipant> = self
            .db
            .fetch(
                Query::table(tables::CONVERSATION_PARTICIPANTS).eq("user_id", user_id.to_string()),
            )
            .await?;
        Ok(rows.into_iter().map(|p| p.conversation_id).collect())
    }

    /// Conversations of the signed-in user with participants and last
    /// message, newest activity first.
    pub async fn fetch_conversations(&self) -> HookResult<Vec<Conversation>> {
        let user = self.db.require_user()?;
        let ids = self.conversation_ids_of(user.id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_list: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut conversations: Vec<Conversation> = self
            .db
            .fetch(Query::table(tables::CONVERSATIONS).in_("id", id_list.clone()))
            .await?;
        let participants: Vec<ConversationParticipant> = self
            .db
            .fetch(Query::table(tables::CONVERSATION_PARTICIPANTS).in_("conversation_id", id_list.clone()))
            .await?;
        let profiles = profiles_by_id(&self.db, participants.iter().map(|p| p.user_id)).await?;
        let latest: Vec<ChatMessage> = self
            .db
            .fetch(
                Query::table(tables::MESSAGES)
                    .in_("conversation_id", id_list)
                    .order("created_at", Direction::Descending),
            )
            .await?;

        let mut by_conversation: HashMap<Uuid, Vec<ConversationParticipant>> = HashMap::new();
        for mut p in participants {
            p.user = profiles.get(&p.user_id).map(Profile::summary);
            by_conversation.entry(p.conversation_id).or_default().push(p);
        }
        let mut last: HashMap<Uuid, ChatMessage> = HashMap::new();
        for mut m in latest {
            if last.contains_key(&m.conversation_id) {
                continue;
            }
            m.author = profiles.get(&m.user_id).map(Profile::summary);
            last.insert(m.conversation_id, m);
        }
        for c in &mut conversations {
            c.participants = by_conversation.remove(&c.id).unwrap_or_default();
            c.last_message = last.remove(&c.id);
        }
        conversations.sort_by_key(|c| std::cmp::Reverse(c.last_activity()));
        Ok(conversations)
    }

    /// Messages of a conversation, oldest first, with authors.
    pub async fn fetch_messages(&self, conversation_id: Uuid) -> HookResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .db
            .fetch(
                Query::table(tables::MESSAGES)
                    .eq("conversation_id", conversation_id.to_string())
                    .order("created_at", Direction::Ascending),
            )
            .await?;
        let authors = profiles_by_id(&self.db, messages.iter().map(|m| m.user_id)).await?;
        for m in &mut messages {
            m.author = authors.get(&m.user_id).map(Profile::summary);
        }
        Ok(messages)
    }

    pub async fn send_message(&self, conversation_id: Uuid, content: &str) -> HookResult<ChatMessage> {
        let user = self.db.require_user()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(HookError::Required("Message"));
        }
        let message: ChatMessage = self
            .db
            .insert(&NewChatMessage {
                conversation_id,
                user_id: user.id,
                content: content.to_string(),
            })
            .await?;
        let touched = json!({ "updated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true) });
        if let Err(e) = self
            .db
            .update::<Conversation, _>(vec![Filter::eq("id", conversation_id.to_string())], &touched)
            .await
        {
            tracing::warn!(conversation = %conversation_id, error = %e, "Failed to touch conversation");
        }
        Ok(message)
    }

    /// Start a conversation with `participant_ids`.
    ///
    /// A single other participant reuses an existing direct conversation.
    /// Returns the conversation id.
    pub async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
        name: Option<String>,
    ) -> HookResult<Uuid> {
        let user = self.db.require_user()?;
        let mut others: Vec<Uuid> = participant_ids
            .iter()
            .copied()
            .filter(|id| *id != user.id)
            .collect();
        others.sort();
        others.dedup();
        if others.is_empty() {
            return Err(CoreError::Validation("Select at least one person to chat with".into()).into());
        }

        let is_group = others.len() > 1;
        if !is_group {
            if let Some(existing) = self.direct_conversation(user.id, others[0]).await? {
                tracing::debug!(conversation = %existing, "Reusing direct conversation");
                return Ok(existing);
            }
        }

        let conversation: Conversation = self
            .db
            .insert(&NewConversation {
                name: if is_group { non_blank(name) } else { None },
                is_group,
                created_by: user.id,
            })
            .await?;
        let rows: Vec<NewParticipant> = std::iter::once(user.id)
            .chain(others)
            .map(|user_id| NewParticipant {
                conversation_id: conversation.id,
                user_id,
            })
            .collect();
        let _: Vec<ConversationParticipant> = self.db.insert_many(&rows).await?;
        tracing::info!(conversation = %conversation.id, is_group, participants = rows.len(), "Conversation created");
        Ok(conversation.id)
    }

    async fn direct_conversation(&self, me: Uuid, other: Uuid) -> HookResult<Option<Uuid>> {
        let mine = self.conversation_ids_of(me).await?;
        let shared: Vec<String> = self
            .conversation_ids_of(other)
            .await?
            .intersection(&mine)
            .map(Uuid::to_string)
            .collect();
        if shared.is_empty() {
            return Ok(None);
        }
        let direct: Option<Conversation> = self
            .db
            .fetch_optional(
                Query::table(tables::CONVERSATIONS)
                    .in_("id", shared)
                    .eq("is_group", false),
            )
            .await?;
        Ok(direct.map(|c| c.id))
    }

    /// Everyone but the signed-in user, by name.
    pub async fn list_people(&self) -> HookResult<Vec<Profile>> {
        let user = self.db.require_user()?;
        Ok(self
            .db
            .fetch(
                Query::table(tables::PROFILES)
                    .neq("id", user.id.to_string())
                    .order("full_name", Direction::Ascending),
            )
            .await?)
    }

    /// Feed of new messages.
    pub async fn subscribe(&self) -> HookResult<Subscription> {
        Ok(self.db.subscribe::<ChatMessage>(None).await?)
    }
}

/// Conversations and transcripts mirrored into signals.
#[derive(Clone, Copy, PartialEq)]
pub struct UseChat {
    app: AppContext,
    pub state: Signal<ChatState>,
    pub people: Signal<Vec<Profile>>,
    pub loading: Signal<bool>,
}

/// Load conversations and follow new messages while mounted.
pub fn use_chat() -> UseChat {
    let app = use_app();
    let state = use_signal(ChatState::default);
    let people = use_signal(Vec::new);
    let loading = use_signal(|| true);
    let hook = UseChat {
        app,
        state,
        people,
        loading,
    };
    use_effect(move || {
        spawn(async move { hook.run().await });
    });
    hook
}

impl UseChat {
    fn service(&self) -> ChatService {
        ChatService::new(self.app.db())
    }

    pub async fn reload_conversations(&self) {
        let (mut state, mut loading) = (self.state, self.loading);
        match self.service().fetch_conversations().await {
            Ok(list) => state.write().set_conversations(list),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching conversations");
                self.app.toaster.error("Failed to load conversations", &e);
            }
        }
        loading.set(false);
    }

    async fn run(&self) {
        self.reload_conversations().await;
        let service = self.service();
        let mut feed = match service.subscribe().await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = %e, "Live chat updates unavailable");
                return;
            }
        };
        let mut state = self.state;
        while let Some(event) = feed.recv().await {
            if event.kind != ChangeKind::Insert {
                continue;
            }
            let mut message = match event.decode::<ChatMessage>() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable chat message");
                    continue;
                }
            };
            message.author = state
                .read()
                .conversation(message.conversation_id)
                .and_then(|c| c.participants.iter().find(|p| p.user_id == message.user_id))
                .and_then(|p| p.user.clone());
            let outcome = state.write().apply_insert(message);
            if outcome == InsertOutcome::UnknownConversation {
                self.reload_conversations().await;
            }
        }
        tracing::debug!("Chat message feed closed");
    }

    /// Open a conversation and load its transcript.
    pub async fn select(&self, conversation_id: Uuid) {
        let mut state = self.state;
        state.write().select(conversation_id);
        match self.service().fetch_messages(conversation_id).await {
            Ok(messages) => state.write().replace_messages(conversation_id, messages),
            Err(e) => {
                tracing::error!(conversation = %conversation_id, error = %e, "Error fetching messages");
                self.app.toaster.error("Failed to load messages", &e);
            }
        }
    }

    /// Send to the selected conversation; `true` when posted.
    pub async fn send(&self, content: String) -> bool {
        let Some(conversation_id) = self.state.read().selected else {
            return false;
        };
        match self.service().send_message(conversation_id, &content).await {
            Ok(mut message) => {
                message.author = self.app.profile.read().as_ref().map(Profile::summary);
                let mut state = self.state;
                state.write().apply_insert(message);
                true
            }
            Err(HookError::Required(_)) => false,
            Err(e) => {
                tracing::error!(conversation = %conversation_id, error = %e, "Error sending message");
                self.app.toaster.error("Failed to send message", &e);
                false
            }
        }
    }

    pub async fn load_people(&self) {
        let mut people = self.people;
        match self.service().list_people().await {
            Ok(list) => people.set(list),
            Err(e) => self.app.toaster.error("Failed to load people", &e),
        }
    }

    /// Create (or reuse) a conversation and open it.
    pub async fn create(&self, participant_ids: Vec<Uuid>, name: Option<String>) -> bool {
        match self.service().create_conversation(&participant_ids, name).await {
            Ok(id) => {
                self.reload_conversations().await;
                self.select(id).await;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating conversation");
                self.app.toaster.error("Failed to create conversation", &e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::{signed_in, switch_to};
    use studyhub_core::Backend;

    #[tokio::test]
    async fn test_direct_conversation_is_reused() {
        let (db, backend, sarah) = signed_in("Sarah Johnson").await;
        let mike = switch_to(&backend, "Mike Chen").await;
        backend.sign_in("sarah.johnson@uni.edu", "secret1").await.unwrap();

        let service = ChatService::new(db);
        let first = service.create_conversation(&[mike], None).await.unwrap();
        let again = service.create_conversation(&[mike, sarah], None).await.unwrap();
        assert_eq!(first, again);

        let list = service.fetch_conversations().await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].is_group);
        assert_eq!(list[0].display_name(sarah), "Mike Chen");
    }

    #[tokio::test]
    async fn test_group_conversation_with_many_participants() {
        let (db, backend, sarah) = signed_in("Sarah Johnson").await;
        let mike = switch_to(&backend, "Mike Chen").await;
        let emma = switch_to(&backend, "Emma Wilson").await;
        backend.sign_in("sarah.johnson@uni.edu", "secret1").await.unwrap();

        let service = ChatService::new(db);
        let id = service
            .create_conversation(&[mike, emma], Some("  ".into()))
            .await
            .unwrap();
        let list = service.fetch_conversations().await.unwrap();
        let conversation = list.iter().find(|c| c.id == id).unwrap();
        assert!(conversation.is_group);
        assert_eq!(conversation.participants.len(), 3);
        assert_eq!(conversation.display_name(sarah), "Group Chat");

        assert!(matches!(
            service.create_conversation(&[sarah], None).await,
            Err(HookError::Core(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_messages_order_and_last_message() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        let mike = switch_to(&backend, "Mike Chen").await;
        let alex = switch_to(&backend, "Alex Rodriguez").await;
        backend.sign_in("sarah.johnson@uni.edu", "secret1").await.unwrap();

        let service = ChatService::new(db);
        let with_mike = service.create_conversation(&[mike], None).await.unwrap();
        let with_alex = service.create_conversation(&[alex], None).await.unwrap();

        service.send_message(with_mike, "one").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.send_message(with_mike, " two ").await.unwrap();
        assert!(matches!(
            service.send_message(with_mike, "  ").await,
            Err(HookError::Required(_))
        ));

        let messages = service.fetch_messages(with_mike).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two"]);

        let list = service.fetch_conversations().await.unwrap();
        assert_eq!(list[0].id, with_mike);
        assert_eq!(list[0].last_message.as_ref().unwrap().content, "two");
        assert_eq!(list[1].id, with_alex);
        assert!(list[1].last_message.is_none());
    }

    #[tokio::test]
    async fn test_list_people_excludes_me() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        switch_to(&backend, "Mike Chen").await;
        switch_to(&backend, "Alex Rodriguez").await;
        backend.sign_in("sarah.johnson@uni.edu", "secret1").await.unwrap();

        let people = ChatService::new(db).list_people().await.unwrap();
        let names: Vec<_> = people.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, ["Alex Rodriguez", "Mike Chen"]);
    }

    #[tokio::test]
    async fn test_feed_and_reducer() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        let mike = switch_to(&backend, "Mike Chen").await;
        backend.sign_in("sarah.johnson@uni.edu", "secret1").await.unwrap();

        let service = ChatService::new(db);
        let id = service.create_conversation(&[mike], None).await.unwrap();
        let mut state = ChatState::default();
        state.set_conversations(service.fetch_conversations().await.unwrap());
        state.replace_messages(id, Vec::new());

        let mut feed = service.subscribe().await.unwrap();
        service.send_message(id, "hi").await.unwrap();
        let incoming: ChatMessage = feed.recv().await.unwrap().decode().unwrap();
        assert_eq!(state.apply_insert(incoming.clone()), InsertOutcome::Applied);
        assert_eq!(state.apply_insert(incoming), InsertOutcome::Duplicate);
        assert_eq!(state.transcript(id).unwrap().len(), 1);
    }
}
