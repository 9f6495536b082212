//! Q&A board: question list, new-question form and thread view.

use chrono::Utc;
use dioxus::prelude::*;
use studyhub_core::model::Discussion;
use uuid::Uuid;

use crate::hooks::discussions::{DiscussionDraft, SolvedFilter, UseDiscussions, filter_discussions, use_discussions};
use crate::state::format::{parse_tags, preview, relative_time};
use crate::state::use_app;

use super::avatar::Avatar;

#[component]
pub fn DiscussionsPage() -> Element {
    let hook = use_discussions();
    let mut query = use_signal(String::new);
    let mut solved = use_signal(SolvedFilter::default);
    let mut show_form = use_signal(|| false);
    let mut open = use_signal(|| None::<Uuid>);

    let selected = open
        .read()
        .and_then(|id| hook.discussions.read().iter().find(|d| d.id == id).cloned());
    if let Some(discussion) = selected {
        return rsx! {
            ThreadView {
                discussion,
                hook,
                on_back: move |_| open.set(None),
            }
        };
    }

    let visible = filter_discussions(&hook.discussions.read(), &query.read(), *solved.read());
    let loading = *hook.loading.read();
    let now = Utc::now();

    rsx! {
        div { class: "discussions",
            div { class: "page-header",
                div {
                    h1 { "Discussions" }
                    p { class: "muted", "Ask questions and help your classmates" }
                }
                button {
                    class: "btn btn-primary",
                    onclick: move |_| {
                        let shown = *show_form.read();
                        show_form.set(!shown);
                    },
                    if *show_form.read() { "Cancel" } else { "Ask Question" }
                }
            }

            if *show_form.read() {
                QuestionForm {
                    hook,
                    on_done: move |_| show_form.set(false),
                }
            }

            div { class: "toolbar",
                input {
                    class: "input search",
                    placeholder: "Search discussions...",
                    value: "{query}",
                    oninput: move |evt| query.set(evt.value()),
                }
                select {
                    class: "input",
                    onchange: move |evt| {
                        solved.set(match evt.value().as_str() {
                            "solved" => SolvedFilter::Solved,
                            "unsolved" => SolvedFilter::Unsolved,
                            _ => SolvedFilter::All,
                        });
                    },
                    option { value: "all", "All" }
                    option { value: "solved", "Solved" }
                    option { value: "unsolved", "Unsolved" }
                }
            }

            if loading && visible.is_empty() {
                div { class: "empty", "Loading discussions..." }
            } else if visible.is_empty() {
                div { class: "empty", "No discussions found. Be the first to ask!" }
            }

            div { class: "discussion-list",
                for d in visible {
                    DiscussionCard {
                        key: "{d.id}",
                        discussion: d.clone(),
                        now,
                        on_open: move |id| open.set(Some(id)),
                        on_vote: move |id| {
                            spawn(async move { hook.vote(id).await });
                        },
                    }
                }
            }
        }
    }
}

#[component]
fn DiscussionCard(
    discussion: Discussion,
    now: chrono::DateTime<Utc>,
    on_open: EventHandler<Uuid>,
    on_vote: EventHandler<Uuid>,
) -> Element {
    let id = discussion.id;
    let author = discussion
        .author
        .as_ref()
        .map(|a| a.name_or("Anonymous").to_string())
        .unwrap_or_else(|| "Anonymous".to_string());

    rsx! {
        div { class: "card discussion-card",
            div { class: "vote-column",
                button {
                    class: "vote-button",
                    onclick: move |evt| {
                        evt.stop_propagation();
                        on_vote.call(id);
                    },
                    "▲"
                }
                span { class: "vote-count", "{discussion.vote_count}" }
            }
            div { class: "discussion-body clickable", onclick: move |_| on_open.call(id),
                div { class: "discussion-title",
                    "{discussion.title}"
                    if discussion.is_solved {
                        span { class: "badge badge-success", "Solved" }
                    }
                }
                div { class: "list-preview", "{preview(&discussion.content, 160)}" }
                div { class: "tag-row",
                    if let Some(course) = &discussion.course {
                        span { class: "badge", "{course}" }
                    }
                    for tag in discussion.tags() {
                        span { key: "{tag}", class: "tag", "#{tag}" }
                    }
                }
                div { class: "list-meta",
                    Avatar { name: Some(author.clone()), size: "xs" }
                    span { "{author}" }
                    span { "{relative_time(discussion.created_at, now)}" }
                    span { "💬 {discussion.reply_count}" }
                }
            }
        }
    }
}

#[component]
fn QuestionForm(hook: UseDiscussions, on_done: EventHandler<()>) -> Element {
    let mut title = use_signal(String::new);
    let mut content = use_signal(String::new);
    let mut course = use_signal(String::new);
    let mut tags = use_signal(String::new);
    let mut busy = use_signal(|| false);

    rsx! {
        form {
            class: "card form-card",
            onsubmit: move |evt: FormEvent| {
                evt.prevent_default();
                let draft = DiscussionDraft {
                    title: title.read().clone(),
                    content: content.read().clone(),
                    course: Some(course.read().clone()),
                    tags: parse_tags(&tags.read()),
                };
                busy.set(true);
                spawn(async move {
                    let created = hook.create(draft).await;
                    busy.set(false);
                    if created {
                        on_done.call(());
                    }
                });
            },
            h2 { "Ask a question" }
            label { class: "field-label", "Title" }
            input {
                class: "input",
                placeholder: "What do you need help with?",
                value: "{title}",
                oninput: move |evt| title.set(evt.value()),
            }
            label { class: "field-label", "Question details" }
            textarea {
                class: "input",
                rows: "5",
                placeholder: "Describe your question in detail...",
                value: "{content}",
                oninput: move |evt| content.set(evt.value()),
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
                    label { class: "field-label", "Tags" }
                    input {
                        class: "input",
                        placeholder: "algorithms, big-o",
                        value: "{tags}",
                        oninput: move |evt| tags.set(evt.value()),
                    }
                }
            }
            button {
                class: "btn btn-primary",
                r#type: "submit",
                disabled: *busy.read(),
                if *busy.read() { "Posting..." } else { "Post Question" }
            }
        }
    }
}

#[component]
fn ThreadView(discussion: Discussion, hook: UseDiscussions, on_back: EventHandler<()>) -> Element {
    let ctx = use_app();
    let discussion_id = discussion.id;
    let mut reload = use_signal(|| 0u32);
    let mut reply_text = use_signal(String::new);
    let mut busy = use_signal(|| false);

    let replies = use_resource(move || async move {
        let _ = reload.read();
        hook.replies(discussion_id).await
    });

    let is_author = discussion.user_id == ctx.user_id();
    let now = Utc::now();
    let author = discussion
        .author
        .as_ref()
        .map(|a| a.name_or("Anonymous").to_string())
        .unwrap_or_else(|| "Anonymous".to_string());
    let loaded = replies.read().clone();

    rsx! {
        div { class: "thread",
            button { class: "link", onclick: move |_| on_back.call(()), "← Back to discussions" }

            div { class: "card thread-question",
                h1 {
                    "{discussion.title}"
                    if discussion.is_solved {
                        span { class: "badge badge-success", "Solved" }
                    }
                }
                div { class: "list-meta",
                    Avatar { name: Some(author.clone()), size: "xs" }
                    span { "{author}" }
                    span { "{relative_time(discussion.created_at, now)}" }
                    if let Some(course) = &discussion.course {
                        span { class: "badge", "{course}" }
                    }
                }
                p { class: "thread-content", "{discussion.content}" }
                div { class: "tag-row",
                    for tag in discussion.tags() {
                        span { key: "{tag}", class: "tag", "#{tag}" }
                    }
                }
            }

            h2 { "Replies ({discussion.reply_count})" }
            {match loaded {
                None => rsx! { div { class: "empty", "Loading replies..." } },
                Some(list) if list.is_empty() => rsx! {
                    div { class: "empty", "No replies yet. Share what you know!" }
                },
                Some(list) => rsx! {
                    for reply in list {
                        {
                            let name = reply
                                .author
                                .as_ref()
                                .map(|a| a.name_or("Anonymous").to_string())
                                .unwrap_or_else(|| "Anonymous".to_string());
                            let can_accept = is_author && !reply.is_solution;
                            let accepted = reply.clone();
                            rsx! {
                                div {
                                    key: "{reply.id}",
                                    class: if reply.is_solution { "card reply solution" } else { "card reply" },
                                    div { class: "list-meta",
                                        Avatar { name: Some(name.clone()), size: "xs" }
                                        span { "{name}" }
                                        span { "{relative_time(reply.created_at, now)}" }
                                        if reply.is_solution {
                                            span { class: "badge badge-success", "✓ Solution" }
                                        }
                                    }
                                    p { "{reply.content}" }
                                    if can_accept {
                                        button {
                                            class: "btn btn-ghost",
                                            onclick: move |_| {
                                                let reply = accepted.clone();
                                                spawn(async move {
                                                    if hook.mark_solution(reply).await {
                                                        reload += 1;
                                                    }
                                                });
                                            },
                                            "Mark as solution"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
            }}

            form {
                class: "card form-card",
                onsubmit: move |evt: FormEvent| {
                    evt.prevent_default();
                    let text = reply_text.read().clone();
                    busy.set(true);
                    spawn(async move {
                        if hook.reply(discussion_id, text).await {
                            reply_text.set(String::new());
                            reload += 1;
                        }
                        busy.set(false);
                    });
                },
                label { class: "field-label", "Your answer" }
                textarea {
                    class: "input",
                    rows: "4",
                    placeholder: "Write a helpful reply...",
                    value: "{reply_text}",
                    oninput: move |evt| reply_text.set(evt.value()),
                }
                button {
                    class: "btn btn-primary",
                    r#type: "submit",
                    disabled: *busy.read() || reply_text.read().trim().is_empty(),
                    "Post Reply"
                }
            }
        }
    }
}
