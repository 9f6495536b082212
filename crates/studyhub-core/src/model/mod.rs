//! Rows mirrored from the hosted database.
//!
//! Every row carries a unique `id` and, where it has an author, a `user_id`
//! foreign key into `profiles`. Author details are joined on the client and
//! stored in fields that are never serialized back.

pub mod chat;
pub mod discussion;
pub mod file;
pub mod group;
pub mod profile;

pub use chat::{ChatMessage, Conversation, ConversationParticipant, NewChatMessage, NewConversation, NewParticipant};
pub use discussion::{Discussion, DiscussionReply, NewDiscussion, NewReply};
pub use file::{FileRecord, FileType, NewFileRecord, MAX_UPLOAD_BYTES, mime_for_extension};
pub use group::{GroupMember, GroupMessage, GroupMessageType, GroupRole, NewGroup, NewGroupMember, NewGroupMessage, StudyGroup};
pub use profile::{AuthorSummary, Profile, ProfilePatch};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A database table backed by a row type.
pub trait Table: DeserializeOwned + Serialize + Send {
    /// Table name on the backend.
    const NAME: &'static str;
}

/// Table names.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const DISCUSSIONS: &str = "discussions";
    pub const DISCUSSION_REPLIES: &str = "discussion_replies";
    pub const FILES: &str = "files";
    pub const STUDY_GROUPS: &str = "study_groups";
    pub const GROUP_MEMBERS: &str = "group_members";
    pub const GROUP_MESSAGES: &str = "group_messages";
    pub const CONVERSATIONS: &str = "conversations";
    pub const CONVERSATION_PARTICIPANTS: &str = "conversation_participants";
    pub const MESSAGES: &str = "messages";
}
