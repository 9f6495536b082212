//! Direct and group conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthorSummary, Table, tables};

/// A conversation between two or more users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub participants: Vec<ConversationParticipant>,
    #[serde(default, skip_serializing)]
    pub last_message: Option<ChatMessage>,
}

impl Table for Conversation {
    const NAME: &'static str = tables::CONVERSATIONS;
}

impl Conversation {
    /// Timestamp of the latest activity, used for list ordering.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at.max(self.updated_at))
            .unwrap_or(self.updated_at)
    }

    /// The first participant that is not `me`.
    pub fn other_participant(&self, me: Uuid) -> Option<&ConversationParticipant> {
        self.participants.iter().find(|p| p.user_id != me)
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Name shown in the conversation list.
    pub fn display_name(&self, me: Uuid) -> String {
        if self.is_group {
            return self
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Group Chat".to_string());
        }
        self.other_participant(me)
            .and_then(|p| p.user.as_ref())
            .and_then(|u| u.full_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Avatar of the other participant for direct chats.
    pub fn display_avatar(&self, me: Uuid) -> Option<String> {
        if self.is_group {
            return None;
        }
        self.other_participant(me)
            .and_then(|p| p.user.as_ref())
            .and_then(|u| u.avatar_url.clone())
    }
}

/// Membership of a user in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationParticipant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing)]
    pub user: Option<AuthorSummary>,
}

impl Table for ConversationParticipant {
    const NAME: &'static str = tables::CONVERSATION_PARTICIPANTS;
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub author: Option<AuthorSummary>,
}

impl Table for ChatMessage {
    const NAME: &'static str = tables::MESSAGES;
}

/// Insert payload for a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewConversation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_group: bool,
    pub created_by: Uuid,
}

/// Insert payload for a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewParticipant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

/// Insert payload for a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatMessage {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(is_group: bool, name: Option<&str>, me: Uuid, other: Uuid) -> Conversation {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Conversation {
            id,
            name: name.map(str::to_string),
            is_group,
            created_by: me,
            created_at: now,
            updated_at: now,
            participants: vec![
                ConversationParticipant {
                    conversation_id: id,
                    user_id: me,
                    user: Some(AuthorSummary {
                        full_name: Some("Me".into()),
                        avatar_url: None,
                    }),
                },
                ConversationParticipant {
                    conversation_id: id,
                    user_id: other,
                    user: Some(AuthorSummary {
                        full_name: Some("Mike Chen".into()),
                        avatar_url: Some("https://cdn/mike.png".into()),
                    }),
                },
            ],
            last_message: None,
        }
    }

    #[test]
    fn test_display_name_rules() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(conversation(false, None, me, other).display_name(me), "Mike Chen");
        assert_eq!(conversation(true, None, me, other).display_name(me), "Group Chat");
        assert_eq!(
            conversation(true, Some("CS 301"), me, other).display_name(me),
            "CS 301"
        );

        let mut lonely = conversation(false, None, me, other);
        lonely.participants.retain(|p| p.user_id == me);
        assert_eq!(lonely.display_name(me), "Unknown User");
    }

    #[test]
    fn test_display_avatar_only_for_direct() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            conversation(false, None, me, other).display_avatar(me).as_deref(),
            Some("https://cdn/mike.png")
        );
        assert!(conversation(true, None, me, other).display_avatar(me).is_none());
    }
}
