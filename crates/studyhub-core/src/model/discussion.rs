//! Discussion board threads and replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthorSummary, Table, tables};

/// A question posted to the discussion board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_solved: bool,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub author: Option<AuthorSummary>,
}

impl Table for Discussion {
    const NAME: &'static str = tables::DISCUSSIONS;
}

impl Discussion {
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// An answer within a discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionReply {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub is_solution: bool,
    #[serde(default)]
    pub vote_count: i64,
    pub user_id: Uuid,
    pub discussion_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub author: Option<AuthorSummary>,
}

impl Table for DiscussionReply {
    const NAME: &'static str = tables::DISCUSSION_REPLIES;
}

/// Insert payload for a discussion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDiscussion {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub user_id: Uuid,
}

/// Insert payload for a reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReply {
    pub content: String,
    pub discussion_id: Uuid,
    pub user_id: Uuid,
}
