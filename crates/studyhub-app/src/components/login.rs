//! Sign-in and registration screen.

use std::sync::Arc;

use dioxus::prelude::*;

use crate::bridge::AppHandle;
use crate::demo::DEMO_PASSWORD;
use crate::hooks::auth::{AuthService, MIN_PASSWORD_LEN, enter_app};
use crate::state::AppPhase;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    SignIn,
    SignUp,
}

#[component]
pub fn LoginView(handle: Arc<AppHandle>, phase: Signal<AppPhase>) -> Element {
    let mut mode = use_signal(|| Mode::SignIn);
    let mut full_name = use_signal(String::new);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut error = use_signal(|| None::<String>);
    let mut busy = use_signal(|| false);

    let current = *mode.read();
    let offline = handle.offline;

    let button_label = match (current, *busy.read()) {
        (Mode::SignIn, false) => "Sign In",
        (Mode::SignIn, true) => "Signing in...",
        (Mode::SignUp, false) => "Create Account",
        (Mode::SignUp, true) => "Creating account...",
    };
    let password_hint = match current {
        Mode::SignIn => "Password".to_string(),
        Mode::SignUp => format!("At least {MIN_PASSWORD_LEN} characters"),
    };

    let mut submit = move || {
        if *busy.read() {
            return;
        }
        let handle = handle.clone();
        let (name, mail, pass) = (full_name.read().clone(), email.read().clone(), password.read().clone());
        busy.set(true);
        error.set(None);
        spawn(async move {
            let service = AuthService::new(handle.db.clone());
            let result = match current {
                Mode::SignIn => service.sign_in(&mail, &pass).await,
                Mode::SignUp => service.sign_up(&name, &mail, &pass).await,
            };
            busy.set(false);
            match result {
                Ok(session) => enter_app(phase, handle, &session),
                Err(e) => error.set(Some(e.to_string())),
            }
        });
    };

    rsx! {
        div { class: "auth-container",
            div { class: "auth-card",
                div { class: "auth-logo", "S" }
                div { class: "auth-title", "StudyHub" }
                div { class: "auth-subtitle", "Share notes, ask questions, study together" }

                div { class: "auth-tabs",
                    button {
                        class: if current == Mode::SignIn { "auth-tab active" } else { "auth-tab" },
                        onclick: move |_| mode.set(Mode::SignIn),
                        "Sign In"
                    }
                    button {
                        class: if current == Mode::SignUp { "auth-tab active" } else { "auth-tab" },
                        onclick: move |_| mode.set(Mode::SignUp),
                        "Sign Up"
                    }
                }

                form {
                    class: "auth-form",
                    onsubmit: move |evt: FormEvent| {
                        evt.prevent_default();
                        submit();
                    },
                    if current == Mode::SignUp {
                        label { class: "field-label", "Full name" }
                        input {
                            class: "input",
                            r#type: "text",
                            placeholder: "Sarah Johnson",
                            value: "{full_name}",
                            oninput: move |evt| full_name.set(evt.value()),
                        }
                    }
                    label { class: "field-label", "Email" }
                    input {
                        class: "input",
                        r#type: "email",
                        placeholder: "you@university.edu",
                        value: "{email}",
                        oninput: move |evt| email.set(evt.value()),
                    }
                    label { class: "field-label", "Password" }
                    input {
                        class: "input",
                        r#type: "password",
                        placeholder: "{password_hint}",
                        value: "{password}",
                        oninput: move |evt| password.set(evt.value()),
                    }

                    if let Some(err) = error.read().as_ref() {
                        div { class: "form-error", "{err}" }
                    }

                    button {
                        class: "btn btn-primary btn-block",
                        r#type: "submit",
                        disabled: *busy.read(),
                        "{button_label}"
                    }
                }

                if offline {
                    div { class: "auth-hint",
                        "Demo accounts: sarah@uni.edu, mike@uni.edu, alex@uni.edu, emma@uni.edu. "
                        "Password: {DEMO_PASSWORD}"
                    }
                }
            }
        }
    }
}
