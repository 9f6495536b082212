//! Study group directory.

use dioxus::prelude::*;

use crate::hooks::groups::{GroupDraft, UseGroups, filter_groups, use_groups};
use crate::state::{Route, use_app};

#[component]
pub fn GroupsPage() -> Element {
    let ctx = use_app();
    let groups = use_groups();
    let mut query = use_signal(String::new);
    let mut show_form = use_signal(|| false);

    let visible = filter_groups(&groups.groups.read(), &query.read());
    let loading = *groups.loading.read();

    rsx! {
        div { class: "groups",
            div { class: "page-header",
                div {
                    h1 { "Study Groups" }
                    p { class: "muted", "Find classmates and study together" }
                }
                button {
                    class: "btn btn-primary",
                    onclick: move |_| {
                        let shown = *show_form.read();
                        show_form.set(!shown);
                    },
                    if *show_form.read() { "Cancel" } else { "Create Group" }
                }
            }

            if *show_form.read() {
                GroupForm { groups, on_done: move |_| show_form.set(false) }
            }

            div { class: "toolbar",
                input {
                    class: "input search",
                    placeholder: "Search groups by name, course or description...",
                    value: "{query}",
                    oninput: move |evt| query.set(evt.value()),
                }
            }

            if loading && visible.is_empty() {
                div { class: "empty", "Loading groups..." }
            } else if visible.is_empty() {
                div { class: "empty", "No study groups found. Start one!" }
            }

            div { class: "group-grid",
                for group in visible {
                    {
                        let group_id = group.id;
                        let member = groups.is_member(group_id);
                        let capacity = match group.max_members {
                            Some(max) => format!("{} / {max} members", group.member_count),
                            None => format!("{} members", group.member_count),
                        };
                        rsx! {
                            div { key: "{group.id}", class: "card group-card",
                                div { class: "group-title",
                                    "{group.name}"
                                    if group.is_private {
                                        span { class: "badge badge-muted", "Private" }
                                    }
                                }
                                if let Some(course) = &group.course {
                                    span { class: "badge", "{course}" }
                                }
                                if let Some(description) = &group.description {
                                    p { class: "list-preview", "{description}" }
                                }
                                div { class: "list-meta", span { "👥 {capacity}" } }
                                div { class: "group-actions",
                                    if member {
                                        button {
                                            class: "btn btn-primary",
                                            onclick: move |_| ctx.navigate(Route::GroupChat(group_id)),
                                            "Open Chat"
                                        }
                                        button {
                                            class: "btn btn-ghost",
                                            onclick: move |_| {
                                                spawn(async move { groups.leave(group_id).await });
                                            },
                                            "Leave"
                                        }
                                    } else if group.is_full() {
                                        button { class: "btn", disabled: true, "Full" }
                                    } else {
                                        button {
                                            class: "btn btn-primary",
                                            onclick: move |_| {
                                                spawn(async move { groups.join(group_id).await });
                                            },
                                            "Join Group"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn GroupForm(groups: UseGroups, on_done: EventHandler<()>) -> Element {
    let mut name = use_signal(String::new);
    let mut description = use_signal(String::new);
    let mut course = use_signal(String::new);
    let mut max_members = use_signal(String::new);
    let mut is_private = use_signal(|| false);
    let mut busy = use_signal(|| false);

    rsx! {
        form {
            class: "card form-card",
            onsubmit: move |evt: FormEvent| {
                evt.prevent_default();
                let draft = GroupDraft {
                    name: name.read().clone(),
                    description: Some(description.read().clone()),
                    course: Some(course.read().clone()),
                    is_private: *is_private.read(),
                    max_members: max_members.read().trim().parse().ok(),
                };
                busy.set(true);
                spawn(async move {
                    let created = groups.create(draft).await;
                    busy.set(false);
                    if created {
                        on_done.call(());
                    }
                });
            },
            h2 { "Create a study group" }
            label { class: "field-label", "Group name" }
            input {
                class: "input",
                placeholder: "e.g. CS 301 Study Group",
                value: "{name}",
                oninput: move |evt| name.set(evt.value()),
            }
            label { class: "field-label", "Description" }
            textarea {
                class: "input",
                rows: "3",
                placeholder: "When and how do you meet?",
                value: "{description}",
                oninput: move |evt| description.set(evt.value()),
            }
            div { class: "field-row",
                div {
                    label { class: "field-label", "Course" }
                    input {
                        class: "input",
                        placeholder: "e.g. CS 301",
                        value: "{course}",
                        oninput: move |evt| course.set(evt.value()),
                    }
                }
                div {
                    label { class: "field-label", "Max members" }
                    input {
                        class: "input",
                        r#type: "number",
                        min: "1",
                        placeholder: "No limit",
                        value: "{max_members}",
                        oninput: move |evt| max_members.set(evt.value()),
                    }
                }
            }
            label { class: "checkbox",
                input {
                    r#type: "checkbox",
                    checked: *is_private.read(),
                    onchange: move |evt| is_private.set(evt.checked()),
                }
                "Private group"
            }
            button {
                class: "btn btn-primary",
                r#type: "submit",
                disabled: *busy.read(),
                if *busy.read() { "Creating..." } else { "Create Group" }
            }
        }
    }
}
