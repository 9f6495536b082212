//! Toast notifications in the bottom-right corner.

use dioxus::prelude::*;

use crate::state::use_app;

#[component]
pub fn ToastStack() -> Element {
    let ctx = use_app();
    let toaster = ctx.toaster;
    let toasts = toaster.visible();

    rsx! {
        div { class: "toast-stack",
            for toast in toasts {
                div { key: "{toast.id}", class: "{toast.kind.class()}",
                    div { class: "toast-body",
                        div { class: "toast-title", "{toast.title}" }
                        if let Some(description) = &toast.description {
                            div { class: "toast-description", "{description}" }
                        }
                    }
                    button {
                        class: "toast-close",
                        onclick: move |_| toaster.dismiss(toast.id),
                        "×"
                    }
                }
            }
        }
    }
}
