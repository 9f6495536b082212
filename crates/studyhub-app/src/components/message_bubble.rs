//! Single chat message.

use dioxus::prelude::*;
use studyhub_core::model::GroupMessageType;

/// Message bubble component.
#[component]
pub fn MessageBubble(
    content: String,
    author: String,
    is_mine: bool,
    time: String,
    #[props(default)]
    kind: GroupMessageType,
    #[props(default)]
    file_url: Option<String>,
) -> Element {
    let bubble_class = if is_mine { "message-bubble mine" } else { "message-bubble theirs" };

    rsx! {
        div { class: "{bubble_class}",
            if !is_mine {
                div { class: "message-author", "{author}" }
            }

            {match (kind, file_url) {
                (GroupMessageType::Image, Some(url)) => rsx! {
                    img { class: "message-image", src: "{url}", alt: "{content}" }
                    if !content.is_empty() {
                        div { class: "message-content", "{content}" }
                    }
                },
                (GroupMessageType::Document, Some(url)) => rsx! {
                    a { class: "message-document", href: "{url}", target: "_blank",
                        span { class: "message-document-icon", "📄" }
                        span { if content.is_empty() { "Document" } else { "{content}" } }
                    }
                },
                _ => rsx! {
                    div { class: "message-content", "{content}" }
                },
            }}

            div { class: "message-meta",
                span { class: "message-time", "{time}" }
            }
        }
    }
}
