//! Lecture file library with search and type filter.

use chrono::Utc;
use dioxus::prelude::*;
use studyhub_core::model::FileType;

use crate::hooks::files::{filter_files, use_files};
use crate::state::format::{file_size, relative_time};
use crate::state::{Route, use_app};

#[component]
pub fn LibraryPage() -> Element {
    let ctx = use_app();
    let files = use_files();
    let mut query = use_signal(String::new);
    let mut kind = use_signal(|| None::<FileType>);

    let visible = filter_files(&files.files.read(), &query.read(), *kind.read());
    let loading = *files.loading.read();
    let now = Utc::now();

    rsx! {
        div { class: "library",
            div { class: "page-header",
                div {
                    h1 { "Lecture Library" }
                    p { class: "muted", "Notes, slides and recordings shared by your classmates" }
                }
                button { class: "btn btn-primary", onclick: move |_| ctx.navigate(Route::Upload), "Upload File" }
            }

            div { class: "toolbar",
                input {
                    class: "input search",
                    placeholder: "Search by title, course or tag...",
                    value: "{query}",
                    oninput: move |evt| query.set(evt.value()),
                }
                select {
                    class: "input",
                    onchange: move |evt| {
                        let value = evt.value();
                        kind.set(FileType::ALL.into_iter().find(|t| t.label() == value));
                    },
                    option { value: "all", "All types" }
                    for t in FileType::ALL {
                        option { key: "{t.label()}", value: "{t.label()}", "{t.icon()} {t.label()}" }
                    }
                }
            }

            if loading && visible.is_empty() {
                div { class: "empty", "Loading files..." }
            } else if visible.is_empty() {
                div { class: "empty", "No files found." }
            }

            div { class: "file-grid",
                for file in visible {
                    {
                        let download = file.clone();
                        let uploader = file
                            .uploader
                            .as_ref()
                            .map(|u| u.name_or("Unknown").to_string())
                            .unwrap_or_else(|| "Unknown".to_string());
                        rsx! {
                            div { key: "{file.id}", class: "card file-card",
                                div { class: "file-icon", "{file.file_type.icon()}" }
                                div { class: "file-title", "{file.title}" }
                                if let Some(description) = &file.description {
                                    div { class: "list-preview", "{description}" }
                                }
                                div { class: "tag-row",
                                    if let Some(course) = &file.course {
                                        span { class: "badge", "{course}" }
                                    }
                                    for tag in file.tags() {
                                        span { key: "{tag}", class: "tag", "#{tag}" }
                                    }
                                }
                                div { class: "list-meta",
                                    span { "{uploader}" }
                                    span { "{file_size(file.file_size.unwrap_or(0))}" }
                                    span { "{relative_time(file.created_at, now)}" }
                                    span { "⬇ {file.download_count}" }
                                }
                                button {
                                    class: "btn btn-primary btn-block",
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
        }
    }
}
