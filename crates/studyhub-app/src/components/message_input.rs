//! Composer shared by direct and group chats.

use dioxus::prelude::*;

#[component]
pub fn MessageInput(
    on_send: EventHandler<String>,
    #[props(default = "Type a message...".to_string())]
    placeholder: String,
    /// Shows the paperclip button when set.
    #[props(default)]
    on_attach: Option<EventHandler<()>>,
    #[props(default)]
    disabled: bool,
) -> Element {
    let mut draft = use_signal(String::new);

    let ready = !disabled && !draft.read().trim().is_empty();

    // Enter and the button both end up here; Shift+Enter keeps a newline.
    let mut flush = move || {
        if !ready {
            return;
        }
        let content = draft.read().trim().to_string();
        draft.set(String::new());
        on_send.call(content);
    };

    rsx! {
        div { class: "message-input-bar",
            if let Some(attach) = on_attach {
                button {
                    class: "attach-button",
                    title: "Attach a file",
                    disabled,
                    onclick: move |_| attach.call(()),
                    "📎"
                }
            }
            textarea {
                class: "message-input",
                rows: "1",
                placeholder: "{placeholder}",
                disabled,
                value: "{draft}",
                oninput: move |evt| draft.set(evt.value()),
                onkeydown: move |evt: KeyboardEvent| {
                    if evt.key() == Key::Enter && !evt.modifiers().shift() {
                        evt.prevent_default();
                        flush();
                    }
                },
            }
            button {
                class: "send-button",
                title: "Send",
                disabled: !ready,
                onclick: move |_| flush(),
                "➤"
            }
        }
    }
}
