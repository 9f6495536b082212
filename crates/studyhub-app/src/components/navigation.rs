//! Top navigation bar.

use dioxus::prelude::*;

use crate::hooks::auth::use_auth;
use crate::state::{Route, use_app};

use super::avatar::Avatar;

#[component]
pub fn NavBar() -> Element {
    let ctx = use_app();
    let auth = use_auth();
    let current = *ctx.route.read();
    let profile = ctx.profile.read().clone();
    let name = profile
        .as_ref()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| "Student".to_string());
    let offline = ctx.handle.read().offline;

    rsx! {
        nav { class: "navbar",
            div { class: "navbar-brand",
                span { class: "navbar-logo", "S" }
                span { class: "navbar-title", "StudyHub" }
                if offline {
                    span { class: "badge badge-muted", "offline demo" }
                }
            }
            div { class: "navbar-links",
                for route in Route::NAV {
                    button {
                        key: "{route.label()}",
                        class: if route.highlights(current) { "nav-link active" } else { "nav-link" },
                        onclick: move |_| ctx.navigate(route),
                        span { class: "nav-icon", "{route.icon()}" }
                        span { "{route.label()}" }
                    }
                }
            }
            div { class: "navbar-user",
                Avatar { name: Some(name.clone()), size: "sm" }
                span { class: "navbar-user-name", "{name}" }
                button {
                    class: "btn btn-ghost",
                    onclick: move |_| {
                        spawn(async move { auth.sign_out().await });
                    },
                    "Sign out"
                }
            }
        }
    }
}
