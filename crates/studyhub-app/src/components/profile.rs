//! Profile card, activity summary and edit form.

use dioxus::prelude::*;
use studyhub_core::model::{Profile, ProfilePatch};

use crate::hooks::auth::{UseAuth, use_auth};
use crate::hooks::stats::use_stats;
use crate::state::use_app;

use super::avatar::Avatar;

#[component]
pub fn ProfilePage() -> Element {
    let ctx = use_app();
    let auth = use_auth();
    let stats = use_stats();
    let mut editing = use_signal(|| false);

    let profile = ctx.profile.read().clone();
    let email = profile
        .as_ref()
        .and_then(|p| p.email.clone())
        .or_else(|| ctx.user.read().email.clone())
        .unwrap_or_default();
    let name = profile
        .as_ref()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| email.clone());
    let user_stats = *stats.user.read();

    rsx! {
        div { class: "profile",
            div { class: "page-header",
                div {
                    h1 { "Profile" }
                    p { class: "muted", "How classmates see you" }
                }
                if !*editing.read() {
                    button { class: "btn btn-primary", onclick: move |_| editing.set(true), "Edit Profile" }
                }
            }

            div { class: "profile-columns",
                section { class: "card profile-card",
                    Avatar { name: Some(name.clone()), size: "lg" }
                    h2 { "{name}" }
                    p { class: "muted", "{email}" }
                    if let Some(p) = &profile {
                        div { class: "tag-row",
                            if let Some(role) = &p.role {
                                span { class: "badge", "{role}" }
                            }
                            if let Some(department) = &p.department {
                                span { class: "badge badge-muted", "{department}" }
                            }
                            if let Some(level) = &p.level {
                                span { class: "badge badge-muted", "{level}" }
                            }
                        }
                    }
                }

                section { class: "card",
                    if *editing.read() {
                        ProfileForm {
                            auth,
                            profile: profile.clone(),
                            on_done: move |_| editing.set(false),
                        }
                    } else {
                        h2 { "About" }
                        {match profile.as_ref().and_then(|p| p.bio.clone()).filter(|b| !b.trim().is_empty()) {
                            Some(bio) => rsx! { p { class: "bio", "{bio}" } },
                            None => rsx! {
                                p { class: "muted", "No bio available. Click edit to add a bio." }
                            },
                        }}
                    }
                }
            }

            section { class: "card",
                h2 { "Activity summary" }
                div { class: "stat-grid",
                    div { class: "stat",
                        div { class: "stat-value", "{user_stats.files_uploaded}" }
                        div { class: "stat-label", "Files uploaded" }
                    }
                    div { class: "stat",
                        div { class: "stat-value", "{user_stats.questions_asked}" }
                        div { class: "stat-label", "Questions asked" }
                    }
                    div { class: "stat",
                        div { class: "stat-value", "{user_stats.answers_given}" }
                        div { class: "stat-label", "Answers given" }
                    }
                    div { class: "stat",
                        div { class: "stat-value", "{user_stats.groups_joined}" }
                        div { class: "stat-label", "Groups joined" }
                    }
                }
            }
        }
    }
}

#[component]
fn ProfileForm(auth: UseAuth, profile: Option<Profile>, on_done: EventHandler<()>) -> Element {
    let field = |pick: fn(&Profile) -> Option<String>| profile.as_ref().and_then(pick).unwrap_or_default();
    let mut full_name = use_signal(|| field(|p| p.full_name.clone()));
    let mut bio = use_signal(|| field(|p| p.bio.clone()));
    let mut department = use_signal(|| field(|p| p.department.clone()));
    let mut level = use_signal(|| field(|p| p.level.clone()));
    let saving = *auth.saving.read();

    rsx! {
        form {
            class: "form-card",
            onsubmit: move |evt: FormEvent| {
                evt.prevent_default();
                let patch = ProfilePatch {
                    full_name: Some(full_name.read().clone()),
                    bio: Some(bio.read().clone()),
                    department: Some(department.read().clone()),
                    level: Some(level.read().clone()),
                    avatar_url: None,
                };
                spawn(async move {
                    if auth.update_profile(patch).await {
                        on_done.call(());
                    }
                });
            },
            h2 { "Edit profile" }
            label { class: "field-label", "Full name" }
            input {
                class: "input",
                value: "{full_name}",
                oninput: move |evt| full_name.set(evt.value()),
            }
            label { class: "field-label", "Bio" }
            textarea {
                class: "input",
                rows: "4",
                placeholder: "Tell classmates what you study",
                value: "{bio}",
                oninput: move |evt| bio.set(evt.value()),
            }
            div { class: "field-row",
                div {
                    label { class: "field-label", "Department" }
                    input {
                        class: "input",
                        placeholder: "e.g. Computer Science",
                        value: "{department}",
                        oninput: move |evt| department.set(evt.value()),
                    }
                }
                div {
                    label { class: "field-label", "Level" }
                    input {
                        class: "input",
                        placeholder: "e.g. 300 Level",
                        value: "{level}",
                        oninput: move |evt| level.set(evt.value()),
                    }
                }
            }
            div { class: "dialog-actions",
                button {
                    class: "btn btn-ghost",
                    r#type: "button",
                    onclick: move |_| on_done.call(()),
                    "Cancel"
                }
                button {
                    class: "btn btn-primary",
                    r#type: "submit",
                    disabled: saving,
                    if saving { "Saving..." } else { "Save Changes" }
                }
            }
        }
    }
}
