//! Study groups, their members and group chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthorSummary, Profile, Table, tables};

/// A study group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub max_members: Option<u32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Filled from `group_members` on fetch.
    #[serde(default, skip_serializing)]
    pub member_count: usize,
}

impl Table for StudyGroup {
    const NAME: &'static str = tables::STUDY_GROUPS;
}

impl StudyGroup {
    pub fn is_full(&self) -> bool {
        self.max_members
            .is_some_and(|max| self.member_count >= max as usize)
    }
}

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    #[default]
    Member,
}

/// Membership row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub profile: Option<Profile>,
}

impl Table for GroupMember {
    const NAME: &'static str = tables::GROUP_MEMBERS;
}

/// Kind of group chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMessageType {
    #[default]
    Text,
    Image,
    Document,
}

/// A message posted in a group chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: GroupMessageType,
    #[serde(default)]
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub author: Option<AuthorSummary>,
}

impl Table for GroupMessage {
    const NAME: &'static str = tables::GROUP_MESSAGES;
}

/// Insert payload for a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
    pub created_by: Uuid,
}

/// Insert payload for a membership.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Insert payload for a group message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroupMessage {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub message_type: GroupMessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_row_decodes_with_joined_at() {
        let member: GroupMember = serde_json::from_value(json!({
            "id": "5d0f5f4e-8f7c-4c59-9a53-1f3f4a0f7c01",
            "group_id": "0b6f4f43-2d2c-4b5e-8e8e-6a1e7b0c9d12",
            "user_id": "7f1c7c36-5b1e-4c55-9f2a-0d6b3a8a9e10",
            "role": "member",
            "joined_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(member.role, GroupRole::Member);
        assert_eq!(member.joined_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(member.profile.is_none());
    }

    #[test]
    fn test_member_role_defaults_to_member() {
        let member: GroupMember = serde_json::from_value(json!({
            "id": "5d0f5f4e-8f7c-4c59-9a53-1f3f4a0f7c01",
            "group_id": "0b6f4f43-2d2c-4b5e-8e8e-6a1e7b0c9d12",
            "user_id": "7f1c7c36-5b1e-4c55-9f2a-0d6b3a8a9e10",
            "joined_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(member.role, GroupRole::Member);
    }

    #[test]
    fn test_is_full_respects_cap() {
        let mut group = StudyGroup {
            id: Uuid::new_v4(),
            name: "Algorithms".into(),
            description: None,
            course: None,
            is_private: false,
            max_members: Some(2),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            member_count: 1,
        };
        assert!(!group.is_full());
        group.member_count = 2;
        assert!(group.is_full());
        group.max_members = None;
        assert!(!group.is_full());
    }
}
