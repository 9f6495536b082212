//! Upload form for lecture files.

use std::path::PathBuf;

use chrono::Utc;
use dioxus::prelude::*;

use crate::hooks::files::{UploadDraft, use_files};
use crate::state::format::{file_size, parse_tags, relative_time};
use crate::state::use_app;

/// Own uploads listed beside the form.
const RECENT_UPLOADS: usize = 5;

#[component]
pub fn UploadPage() -> Element {
    let ctx = use_app();
    let files = use_files();
    let mut title = use_signal(String::new);
    let mut description = use_signal(String::new);
    let mut course = use_signal(String::new);
    let mut tags = use_signal(String::new);
    let mut path = use_signal(String::new);

    let uploading = *files.uploading.read();
    let me = ctx.user_id();
    let now = Utc::now();
    let mine: Vec<_> = files
        .files
        .read()
        .iter()
        .filter(|f| f.user_id == me)
        .take(RECENT_UPLOADS)
        .cloned()
        .collect();
    let can_submit = !uploading && !title.read().trim().is_empty() && !path.read().trim().is_empty();

    rsx! {
        div { class: "upload",
            div { class: "page-header",
                div {
                    h1 { "Upload Lecture Materials" }
                    p { class: "muted", "Share your notes and slides with classmates" }
                }
            }

            div { class: "upload-columns",
                form {
                    class: "card form-card",
                    onsubmit: move |evt: FormEvent| {
                        evt.prevent_default();
                        let draft = UploadDraft {
                            title: title.read().clone(),
                            description: Some(description.read().clone()),
                            course: Some(course.read().clone()),
                            tags: parse_tags(&tags.read()),
                        };
                        let file = PathBuf::from(path.read().trim());
                        spawn(async move {
                            if files.upload(draft, file).await {
                                title.set(String::new());
                                description.set(String::new());
                                course.set(String::new());
                                tags.set(String::new());
                                path.set(String::new());
                            }
                        });
                    },

                    div { class: "dropzone",
                        div { class: "dropzone-icon", "⬆" }
                        label { class: "field-label", "File" }
                        input {
                            class: "input",
                            placeholder: "/path/to/lecture-notes.pdf",
                            value: "{path}",
                            oninput: move |evt| path.set(evt.value()),
                        }
                        p { class: "muted small", "Supported: PDF, DOC, PPT, JPG, PNG, MP4 (Max 50MB)" }
                    }

                    label { class: "field-label", "Title" }
                    input {
                        class: "input",
                        placeholder: "e.g. Computer Networks - Chapter 5",
                        value: "{title}",
                        oninput: move |evt| title.set(evt.value()),
                    }
                    label { class: "field-label", "Description" }
                    textarea {
                        class: "input",
                        rows: "3",
                        placeholder: "What does this file cover?",
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
                            label { class: "field-label", "Tags" }
                            input {
                                class: "input",
                                placeholder: "networks, midterm",
                                value: "{tags}",
                                oninput: move |evt| tags.set(evt.value()),
                            }
                        }
                    }
                    button {
                        class: "btn btn-primary btn-block",
                        r#type: "submit",
                        disabled: !can_submit,
                        if uploading { "Uploading..." } else { "Upload File" }
                    }
                }

                section { class: "card",
                    h2 { "Your recent uploads" }
                    if mine.is_empty() {
                        p { class: "empty", "Nothing uploaded yet." }
                    }
                    for file in mine {
                        div { key: "{file.id}", class: "list-row",
                            span { class: "list-icon", "{file.file_type.icon()}" }
                            div { class: "list-body",
                                div { class: "list-title", "{file.title}" }
                                div { class: "list-meta",
                                    span { "{file_size(file.file_size.unwrap_or(0))}" }
                                    span { "{relative_time(file.created_at, now)}" }
                                    span { "⬇ {file.download_count}" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
