//! Dialog for starting a new conversation.

use std::collections::BTreeSet;

use dioxus::prelude::*;
use uuid::Uuid;

use crate::hooks::chat::UseChat;

use super::avatar::Avatar;

#[component]
pub fn CreateConversation(chat: UseChat, on_close: EventHandler<()>) -> Element {
    let mut picked = use_signal(BTreeSet::<Uuid>::new);
    let mut name = use_signal(String::new);
    let mut busy = use_signal(|| false);

    use_effect(move || {
        spawn(async move { chat.load_people().await });
    });

    let people = chat.people.read().clone();
    let count = picked.read().len();
    let is_group = count > 1;

    rsx! {
        div { class: "dialog-backdrop",
            div { class: "dialog card",
                h2 { "New conversation" }
                p { class: "muted small", "Pick one person for a direct chat or several for a group." }

                div { class: "people-list",
                    if people.is_empty() {
                        div { class: "empty", "No other students yet." }
                    }
                    for person in people {
                        {
                            let id = person.id;
                            let checked = picked.read().contains(&id);
                            let display = person.display_name().to_string();
                            rsx! {
                                label { key: "{id}", class: "person-row",
                                    input {
                                        r#type: "checkbox",
                                        checked,
                                        onchange: move |evt| {
                                            if evt.checked() {
                                                picked.write().insert(id);
                                            } else {
                                                picked.write().remove(&id);
                                            }
                                        },
                                    }
                                    Avatar { name: Some(display.clone()), size: "xs" }
                                    div { class: "list-body",
                                        div { class: "list-title", "{display}" }
                                        if let Some(department) = &person.department {
                                            div { class: "muted small", "{department}" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }

                if is_group {
                    label { class: "field-label", "Group name" }
                    input {
                        class: "input",
                        placeholder: "Group Chat",
                        value: "{name}",
                        oninput: move |evt| name.set(evt.value()),
                    }
                }

                div { class: "dialog-actions",
                    button { class: "btn btn-ghost", onclick: move |_| on_close.call(()), "Cancel" }
                    button {
                        class: "btn btn-primary",
                        disabled: count == 0 || *busy.read(),
                        onclick: move |_| {
                            let ids: Vec<Uuid> = picked.read().iter().copied().collect();
                            let group_name = is_group.then(|| name.read().clone());
                            busy.set(true);
                            spawn(async move {
                                let created = chat.create(ids, group_name).await;
                                busy.set(false);
                                if created {
                                    on_close.call(());
                                }
                            });
                        },
                        if *busy.read() { "Creating..." } else { "Create" }
                    }
                }
            }
        }
    }
}
