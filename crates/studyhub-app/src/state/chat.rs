//! Realtime chat state as plain reducers.
//!
//! The hooks feed fetched lists and realtime inserts in here; the reducers
//! keep transcripts ordered by `created_at` and free of duplicates no
//! matter in which order the two arrive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use studyhub_core::model::{ChatMessage, Conversation, GroupMessage};
use uuid::Uuid;

/// Insert `item` keeping `created_at` order. Returns `false` for a duplicate id.
fn insert_ordered<T>(
    list: &mut Vec<T>,
    item: T,
    id: impl Fn(&T) -> Uuid,
    at: impl Fn(&T) -> DateTime<Utc>,
) -> bool {
    let new_id = id(&item);
    if list.iter().any(|m| id(m) == new_id) {
        return false;
    }
    let stamp = at(&item);
    // Equal timestamps keep arrival order.
    let pos = list.partition_point(|m| at(m) <= stamp);
    list.insert(pos, item);
    true
}

fn sort_dedup<T>(list: &mut Vec<T>, id: impl Fn(&T) -> Uuid, at: impl Fn(&T) -> DateTime<Utc>) {
    list.sort_by_key(|m| at(m));
    let mut seen = std::collections::HashSet::new();
    list.retain(|m| seen.insert(id(m)));
}

/// What [`ChatState::apply_insert`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Recorded; the conversation moved to the top of the list.
    Applied,
    /// Already known.
    Duplicate,
    /// Belongs to a conversation that is not in the list yet.
    UnknownConversation,
}

/// Conversations and their transcripts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Newest activity first.
    pub conversations: Vec<Conversation>,
    /// Loaded transcripts, oldest first.
    pub messages: HashMap<Uuid, Vec<ChatMessage>>,
    pub selected: Option<Uuid>,
}

impl ChatState {
    pub fn set_conversations(&mut self, mut list: Vec<Conversation>) {
        list.sort_by_key(|c| std::cmp::Reverse(c.last_activity()));
        self.conversations = list;
        let selected_gone = self
            .selected
            .is_some_and(|id| !self.conversations.iter().any(|c| c.id == id));
        if selected_gone {
            self.selected = None;
        }
    }

    pub fn replace_messages(&mut self, conversation_id: Uuid, mut messages: Vec<ChatMessage>) {
        sort_dedup(&mut messages, |m| m.id, |m| m.created_at);
        self.messages.insert(conversation_id, messages);
    }

    pub fn select(&mut self, conversation_id: Uuid) {
        self.selected = Some(conversation_id);
    }

    pub fn conversation(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected.and_then(|id| self.conversation(id))
    }

    /// Loaded transcript, or `None` when it was never fetched.
    pub fn transcript(&self, conversation_id: Uuid) -> Option<&[ChatMessage]> {
        self.messages.get(&conversation_id).map(Vec::as_slice)
    }

    /// Record a message delivered by the realtime feed or by our own send.
    pub fn apply_insert(&mut self, message: ChatMessage) -> InsertOutcome {
        let Some(index) = self
            .conversations
            .iter()
            .position(|c| c.id == message.conversation_id)
        else {
            return InsertOutcome::UnknownConversation;
        };

        if let Some(transcript) = self.messages.get_mut(&message.conversation_id) {
            if !insert_ordered(transcript, message.clone(), |m| m.id, |m| m.created_at) {
                return InsertOutcome::Duplicate;
            }
        }

        let mut conversation = self.conversations.remove(index);
        let newer = conversation
            .last_message
            .as_ref()
            .is_none_or(|last| last.id != message.id && last.created_at <= message.created_at);
        if newer {
            conversation.last_message = Some(message);
        }
        self.conversations.insert(0, conversation);
        InsertOutcome::Applied
    }
}

/// Transcript of one study group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupTranscript {
    messages: Vec<GroupMessage>,
}

impl GroupTranscript {
    pub fn new(mut messages: Vec<GroupMessage>) -> Self {
        sort_dedup(&mut messages, |m| m.id, |m| m.created_at);
        Self { messages }
    }

    pub fn replace(&mut self, messages: Vec<GroupMessage>) {
        *self = Self::new(messages);
    }

    /// Append a message; `false` when it was already present.
    pub fn push(&mut self, message: GroupMessage) -> bool {
        insert_ordered(&mut self.messages, message, |m| m.id, |m| m.created_at)
    }

    pub fn messages(&self) -> &[GroupMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use studyhub_core::model::GroupMessageType;

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn conversation(id: Uuid, updated: i64) -> Conversation {
        Conversation {
            id,
            name: None,
            is_group: false,
            created_by: Uuid::new_v4(),
            created_at: t(0),
            updated_at: t(updated),
            participants: Vec::new(),
            last_message: None,
        }
    }

    fn message(conversation_id: Uuid, at: i64, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            conversation_id,
            user_id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: t(at),
            author: None,
        }
    }

    #[test]
    fn test_set_conversations_orders_by_activity() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut state = ChatState::default();
        let mut older = conversation(a, 1);
        older.last_message = Some(message(a, 30, "late reply"));
        state.set_conversations(vec![conversation(b, 10), older]);
        assert_eq!(state.conversations[0].id, a);
    }

    #[test]
    fn test_apply_insert_keeps_order_and_moves_to_front() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut state = ChatState::default();
        state.set_conversations(vec![conversation(a, 5), conversation(b, 1)]);
        state.replace_messages(b, vec![message(b, 0, "first"), message(b, 10, "third")]);

        let second = message(b, 5, "second");
        assert_eq!(state.apply_insert(second.clone()), InsertOutcome::Applied);
        let contents: Vec<_> = state.transcript(b).unwrap().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(state.conversations[0].id, b);
        assert_eq!(state.conversations[0].last_message.as_ref().unwrap().id, second.id);

        assert_eq!(state.apply_insert(second), InsertOutcome::Duplicate);
        assert_eq!(state.transcript(b).unwrap().len(), 3);
    }

    #[test]
    fn test_apply_insert_without_loaded_transcript() {
        let a = Uuid::new_v4();
        let mut state = ChatState::default();
        state.set_conversations(vec![conversation(a, 0)]);
        assert_eq!(state.apply_insert(message(a, 1, "hi")), InsertOutcome::Applied);
        assert!(state.transcript(a).is_none());
        assert_eq!(state.conversations[0].last_message.as_ref().unwrap().content, "hi");

        let stranger = message(Uuid::new_v4(), 2, "who?");
        assert_eq!(state.apply_insert(stranger), InsertOutcome::UnknownConversation);
    }

    #[test]
    fn test_selection_dropped_when_conversation_disappears() {
        let a = Uuid::new_v4();
        let mut state = ChatState::default();
        state.set_conversations(vec![conversation(a, 0)]);
        state.select(a);
        assert!(state.selected_conversation().is_some());
        state.set_conversations(Vec::new());
        assert!(state.selected.is_none());
    }

    #[test]
    fn test_group_transcript_dedup() {
        let group_id = Uuid::new_v4();
        let msg = |at: i64| GroupMessage {
            id: Uuid::new_v4(),
            group_id,
            user_id: Uuid::new_v4(),
            content: format!("m{at}"),
            message_type: GroupMessageType::Text,
            file_url: None,
            created_at: t(at),
            author: None,
        };
        let late = msg(9);
        let mut transcript = GroupTranscript::new(vec![late.clone(), msg(1), late.clone()]);
        assert_eq!(transcript.len(), 2);
        assert!(transcript.push(msg(4)));
        assert!(!transcript.push(late));
        let order: Vec<_> = transcript.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(order, ["m1", "m4", "m9"]);
    }
}
