//! UI components for the StudyHub desktop app.

pub mod app;
pub mod avatar;
pub mod chat;
pub mod create_conversation;
pub mod dashboard;
pub mod discussions;
pub mod group_chat;
pub mod groups;
pub mod library;
pub mod login;
pub mod message_bubble;
pub mod message_input;
pub mod navigation;
pub mod profile;
pub mod toasts;
pub mod upload;
