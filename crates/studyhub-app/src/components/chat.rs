//! Direct and group conversations.

use chrono::{Local, Utc};
use dioxus::prelude::*;

use crate::hooks::chat::use_chat;
use crate::state::format::{clock_time, preview, relative_time};
use crate::state::use_app;

use super::avatar::Avatar;
use super::create_conversation::CreateConversation;
use super::message_bubble::MessageBubble;
use super::message_input::MessageInput;

/// Characters of the last message shown in the list.
const PREVIEW_LEN: usize = 40;

#[component]
pub fn ChatPage() -> Element {
    let ctx = use_app();
    let chat = use_chat();
    let mut creating = use_signal(|| false);
    let me = ctx.user_id();
    let now = Utc::now();

    let state = chat.state.read().clone();
    let loading = *chat.loading.read();
    let selected = state.selected_conversation().cloned();
    let transcript = selected
        .as_ref()
        .and_then(|c| state.transcript(c.id))
        .map(<[_]>::to_vec);

    rsx! {
        div { class: "chat-page",
            aside { class: "conversation-list",
                div { class: "conversation-list-header",
                    h2 { "Messages" }
                    button { class: "btn btn-primary btn-small", onclick: move |_| creating.set(true), "New" }
                }
                if loading && state.conversations.is_empty() {
                    div { class: "empty", "Loading conversations..." }
                } else if state.conversations.is_empty() {
                    div { class: "empty", "No conversations yet" }
                }
                for conversation in state.conversations.iter() {
                    {
                        let id = conversation.id;
                        let name = conversation.display_name(me);
                        let active = state.selected == Some(id);
                        let last = conversation
                            .last_message
                            .as_ref()
                            .map(|m| preview(&m.content, PREVIEW_LEN))
                            .unwrap_or_else(|| "No messages yet".to_string());
                        let when = relative_time(conversation.last_activity(), now);
                        rsx! {
                            div {
                                key: "{id}",
                                class: if active { "conversation-row active" } else { "conversation-row" },
                                onclick: move |_| {
                                    spawn(async move { chat.select(id).await });
                                },
                                Avatar { name: Some(name.clone()), size: "sm" }
                                div { class: "list-body",
                                    div { class: "list-title",
                                        "{name}"
                                        if conversation.is_group {
                                            span { class: "badge badge-muted", "{conversation.participants.len()}" }
                                        }
                                    }
                                    div { class: "list-preview", "{last}" }
                                }
                                span { class: "muted small", "{when}" }
                            }
                        }
                    }
                }
            }

            section { class: "conversation-pane",
                {match selected {
                    None => rsx! {
                        div { class: "empty conversation-placeholder", "Select a chat to start messaging" }
                    },
                    Some(conversation) => {
                        let name = conversation.display_name(me);
                        let subtitle = if conversation.is_group {
                            format!("{} participants", conversation.participants.len())
                        } else {
                            "Direct message".to_string()
                        };
                        rsx! {
                            div { class: "chat-header",
                                Avatar { name: Some(name.clone()), size: "sm" }
                                div { class: "chat-header-body",
                                    div { class: "chat-title", "{name}" }
                                    div { class: "muted small", "{subtitle}" }
                                }
                            }
                            div { class: "transcript",
                                {match transcript {
                                    None => rsx! { div { class: "empty", "Loading messages..." } },
                                    Some(messages) if messages.is_empty() => rsx! {
                                        div { class: "empty", "No messages yet. Say hello!" }
                                    },
                                    Some(messages) => rsx! {
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
                                                    }
                                                }
                                            }
                                        }
                                    },
                                }}
                            }
                            MessageInput {
                                on_send: move |text: String| {
                                    spawn(async move {
                                        chat.send(text).await;
                                    });
                                },
                            }
                        }
                    }
                }}
            }

            if *creating.read() {
                CreateConversation { chat, on_close: move |_| creating.set(false) }
            }
        }
    }
}
