//! Root app component: connect, restore the session, then route.

use std::sync::Arc;

use dioxus::prelude::*;
use studyhub_core::AuthUser;

use crate::bridge::{self, AppHandle, LaunchSettings};
use crate::hooks::auth::AuthService;
use crate::hooks::toast::{ToastQueue, Toaster};
use crate::state::{AppContext, AppPhase, Route};

/// Root application component.
#[component]
pub fn App() -> Element {
    let settings = try_use_context::<LaunchSettings>().unwrap_or_default();
    let mut phase = use_signal(|| AppPhase::Loading);

    use_effect(move || {
        if *phase.read() != AppPhase::Loading {
            return;
        }
        let settings = settings.clone();
        spawn(async move {
            match bridge::connect(&settings).await {
                Ok(handle) => {
                    let handle = Arc::new(handle);
                    match handle.restore_session().await {
                        Some(_) => phase.set(AppPhase::Running(handle)),
                        None => phase.set(AppPhase::SignedOut(handle)),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to backend");
                    phase.set(AppPhase::Failed(e.to_string()));
                }
            }
        });
    });

    let current_phase = phase.read().clone();

    match current_phase {
        AppPhase::Loading => rsx! {
            div { class: "loading-screen",
                div { class: "loading-logo", "S" }
                div { class: "loading-text", "Connecting..." }
            }
        },
        AppPhase::Failed(message) => rsx! {
            div { class: "loading-screen",
                div { class: "loading-logo error", "!" }
                div { class: "loading-text", "Could not reach StudyHub" }
                div { class: "loading-detail", "{message}" }
                button {
                    class: "btn btn-primary",
                    onclick: move |_| phase.set(AppPhase::Loading),
                    "Retry"
                }
            }
        },
        AppPhase::SignedOut(handle) => rsx! {
            super::login::LoginView { handle, phase }
        },
        AppPhase::Running(handle) => match handle.db.current_user() {
            Some(user) => rsx! {
                MainLayout { handle, user, phase }
            },
            None => rsx! {
                super::login::LoginView { handle, phase }
            },
        },
    }
}

/// Signed-in layout with shared context.
#[component]
fn MainLayout(handle: Arc<AppHandle>, user: AuthUser, phase: Signal<AppPhase>) -> Element {
    let toasts = use_signal(ToastQueue::default);
    let ctx = use_context_provider(|| AppContext {
        handle: Signal::new(handle.clone()),
        phase,
        route: Signal::new(Route::Dashboard),
        user: Signal::new(user.clone()),
        profile: Signal::new(None),
        toaster: Toaster::new(toasts),
    });

    // Profile for greetings and avatars
    use_effect(move || {
        let mut profile = ctx.profile;
        let service = AuthService::new(ctx.db());
        let user_id = ctx.user_id();
        spawn(async move {
            match service.load_profile(user_id).await {
                Ok(p) => profile.set(p),
                Err(e) => tracing::error!(error = %e, "Error fetching profile"),
            }
        });
    });

    let route = *ctx.route.read();

    rsx! {
        div { class: "main-layout",
            super::navigation::NavBar {}
            main { class: "page",
                {match route {
                    Route::Dashboard => rsx! { super::dashboard::Dashboard {} },
                    Route::Discussions => rsx! { super::discussions::DiscussionsPage {} },
                    Route::Library => rsx! { super::library::LibraryPage {} },
                    Route::Upload => rsx! { super::upload::UploadPage {} },
                    Route::Groups => rsx! { super::groups::GroupsPage {} },
                    Route::GroupChat(group_id) => rsx! {
                        super::group_chat::GroupChatView { key: "{group_id}", group_id }
                    },
                    Route::Chat => rsx! { super::chat::ChatPage {} },
                    Route::Profile => rsx! { super::profile::ProfilePage {} },
                }}
            }
            super::toasts::ToastStack {}
        }
    }
}
