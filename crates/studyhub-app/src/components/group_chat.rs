//! Chat room of a single study group.

use chrono::Local;
use dioxus::prelude::*;
use studyhub_core::model::GroupRole;
use uuid::Uuid;

use crate::hooks::group_chat::use_group_chat;
use crate::state::format::clock_time;
use crate::state::{Route, use_app};

use super::avatar::Avatar;
use super::message_bubble::MessageBubble;
use super::message_input::MessageInput;

#[component]
pub fn GroupChatView(group_id: Uuid) -> Element {
    let ctx = use_app();
    let chat = use_group_chat(group_id);
    let me = ctx.user_id();

    let group = chat.group.read().clone();
    let members = chat.members.read().clone();
    let messages = chat.transcript.read().messages().to_vec();
    let loading = *chat.loading.read();

    let title = group.as_ref().map(|g| g.name.clone()).unwrap_or_else(|| "Study Group".to_string());
    let member_count = group.as_ref().map(|g| g.member_count).unwrap_or(members.len());

    rsx! {
        div { class: "group-chat",
            div { class: "chat-header",
                button { class: "link", onclick: move |_| ctx.navigate(Route::Groups), "←" }
                div { class: "chat-header-body",
                    div { class: "chat-title", "{title}" }
                    div { class: "muted small", "{member_count} members" }
                }
            }

            div { class: "group-chat-body",
                div { class: "transcript",
                    if loading && messages.is_empty() {
                        div { class: "empty", "Loading messages..." }
                    } else if messages.is_empty() {
                        div { class: "empty", "No messages yet. Start the conversation!" }
                    }
                    for message in messages {
                        {
                            let author = message
                                .author
                                .as_ref()
                                .map(|a| a.name_or("Unknown").to_string())
                                .unwrap_or_else(|| "Unknown".to_string());
                            let time = clock_time(message.created_at, &Local);
                            rsx! {
                                MessageBubble {
                                    key: "{message.id}",
                                    content: message.content.clone(),
                                    author,
                                    is_mine: message.user_id == me,
                                    time,
                                    kind: message.message_type,
                                    file_url: message.file_url.clone(),
                                }
                            }
                        }
                    }
                }

                aside { class: "member-list",
                    h3 { "Members" }
                    for member in members {
                        {
                            let name = member
                                .profile
                                .as_ref()
                                .map(|p| p.display_name().to_string())
                                .unwrap_or_else(|| "Unknown".to_string());
                            rsx! {
                                div { key: "{member.id}", class: "member-row",
                                    Avatar { name: Some(name.clone()), size: "xs" }
                                    span { "{name}" }
                                    if member.role == GroupRole::Admin {
                                        span { class: "badge", "admin" }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            MessageInput {
                on_send: move |text: String| {
                    spawn(async move {
                        chat.send(text).await;
                    });
                },
                on_attach: move |_| ctx.toaster.info("Coming soon", "Sharing files in group chats is coming soon"),
                disabled: loading,
            }
        }
    }
}
