//! Landing page: greeting, counters, quick actions and recent activity.

use chrono::Utc;
use dioxus::prelude::*;

use crate::hooks::discussions::use_discussions;
use crate::hooks::files::use_files;
use crate::hooks::groups::use_groups;
use crate::hooks::stats::{StatsService, use_stats};
use crate::state::format::{ActivityLevel, file_size, preview, relative_time};
use crate::state::{Route, use_app};

/// Entries shown per dashboard list.
const LIST_LEN: usize = 3;

#[component]
pub fn Dashboard() -> Element {
    let ctx = use_app();
    let stats = use_stats();
    let files = use_files();
    let discussions = use_discussions();
    let groups = use_groups();

    let activity = use_resource(move || async move {
        let ids: Vec<_> = groups.mine.read().iter().copied().collect();
        match StatsService::new(ctx.db()).group_activity(&ids, Utc::now()).await {
            Ok(levels) => levels,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching group activity");
                Default::default()
            }
        }
    });

    let name = ctx
        .profile
        .read()
        .as_ref()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| "Student".to_string());
    let global = *stats.global.read();
    let now = Utc::now();

    let recent_files: Vec<_> = files.files.read().iter().take(LIST_LEN).cloned().collect();
    let active: Vec<_> = discussions
        .discussions
        .read()
        .iter()
        .take(LIST_LEN)
        .cloned()
        .collect();
    let joined = groups.joined();

    rsx! {
        div { class: "dashboard",
            section { class: "welcome",
                h1 { "Welcome back, {name}!" }
                p { class: "muted", "Here's what's happening in your courses." }
            }

            section { class: "stat-grid",
                StatCard { icon: "📚", label: "Total files", value: global.total_files }
                StatCard { icon: "💬", label: "Discussions", value: global.total_discussions }
                StatCard { icon: "👥", label: "Study groups", value: global.total_groups }
                StatCard { icon: "⚡", label: "Activity this week", value: global.recent_activity }
            }

            section { class: "quick-actions",
                h2 { "Quick actions" }
                div { class: "action-row",
                    button { class: "action-card", onclick: move |_| ctx.navigate(Route::Upload),
                        span { class: "action-icon", "⬆" }
                        span { "Upload notes" }
                    }
                    button { class: "action-card", onclick: move |_| ctx.navigate(Route::Discussions),
                        span { class: "action-icon", "❓" }
                        span { "Ask a question" }
                    }
                    button { class: "action-card", onclick: move |_| ctx.navigate(Route::Groups),
                        span { class: "action-icon", "👥" }
                        span { "Find a study group" }
                    }
                    button { class: "action-card", onclick: move |_| ctx.navigate(Route::Chat),
                        span { class: "action-icon", "✉" }
                        span { "Message a classmate" }
                    }
                }
            }

            div { class: "dashboard-columns",
                section { class: "card",
                    div { class: "card-header",
                        h2 { "Recent files" }
                        button { class: "link", onclick: move |_| ctx.navigate(Route::Library), "View all" }
                    }
                    if recent_files.is_empty() {
                        p { class: "empty", "No files uploaded yet." }
                    }
                    for file in recent_files {
                        {
                            let download = file.clone();
                            rsx! {
                                div { key: "{file.id}", class: "list-row",
                                    span { class: "list-icon", "{file.file_type.icon()}" }
                                    div { class: "list-body",
                                        div { class: "list-title", "{file.title}" }
                                        div { class: "list-meta",
                                            if let Some(course) = &file.course {
                                                span { class: "badge", "{course}" }
                                            }
                                            span { "{file_size(file.file_size.unwrap_or(0))}" }
                                            span { "{relative_time(file.created_at, now)}" }
                                        }
                                    }
                                    button {
                                        class: "btn btn-ghost",
                                        onclick: move |_| {
                                            let file = download.clone();
                                            spawn(async move { files.download(file).await });
                                        },
                                        "Download"
                                    }
                                }
                            }
                        }
                    }
                }

                section { class: "card",
                    div { class: "card-header",
                        h2 { "Active discussions" }
                        button { class: "link", onclick: move |_| ctx.navigate(Route::Discussions), "View all" }
                    }
                    if active.is_empty() {
                        p { class: "empty", "No discussions yet." }
                    }
                    for d in active {
                        div {
                            key: "{d.id}",
                            class: "list-row clickable",
                            onclick: move |_| ctx.navigate(Route::Discussions),
                            div { class: "list-body",
                                div { class: "list-title",
                                    "{d.title}"
                                    if d.is_solved {
                                        span { class: "badge badge-success", "Solved" }
                                    }
                                }
                                div { class: "list-preview", "{preview(&d.content, 80)}" }
                                div { class: "list-meta",
                                    span { "{d.reply_count} replies" }
                                    span { "{relative_time(d.created_at, now)}" }
                                }
                            }
                        }
                    }
                }

                section { class: "card",
                    div { class: "card-header",
                        h2 { "Your study groups" }
                        button { class: "link", onclick: move |_| ctx.navigate(Route::Groups), "Browse" }
                    }
                    if joined.is_empty() {
                        p { class: "empty", "You haven't joined any groups yet." }
                    }
                    for group in joined {
                        {
                            let level = activity
                                .read()
                                .as_ref()
                                .and_then(|levels| levels.get(&group.id).cloned())
                                .unwrap_or(ActivityLevel::Low);
                            let group_id = group.id;
                            rsx! {
                                div {
                                    key: "{group.id}",
                                    class: "list-row clickable",
                                    onclick: move |_| ctx.navigate(Route::GroupChat(group_id)),
                                    div { class: "list-body",
                                        div { class: "list-title", "{group.name}" }
                                        div { class: "list-meta",
                                            span { "{group.member_count} members" }
                                            if let Some(course) = &group.course {
                                                span { class: "badge", "{course}" }
                                            }
                                        }
                                    }
                                    span { class: "activity activity-{level.label()}", "{level.label()}" }
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
fn StatCard(icon: &'static str, label: &'static str, value: u64) -> Element {
    rsx! {
        div { class: "stat-card",
            span { class: "stat-icon", "{icon}" }
            div {
                div { class: "stat-value", "{value}" }
                div { class: "stat-label", "{label}" }
            }
        }
    }
}
