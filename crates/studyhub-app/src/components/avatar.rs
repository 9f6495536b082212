//! Initials avatar.

use dioxus::prelude::*;

use crate::state::format::initials_or_default;

#[component]
pub fn Avatar(
    name: Option<String>,
    #[props(default = "md".to_string())]
    size: String,
) -> Element {
    let letters = initials_or_default(name.as_deref());
    rsx! {
        div { class: "avatar avatar-{size}", title: name.unwrap_or_default(), "{letters}" }
    }
}
