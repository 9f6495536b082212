//! Global app state using Dioxus signals.

pub mod chat;
pub mod format;

use std::sync::Arc;

use dioxus::prelude::*;
use studyhub_core::model::Profile;
use studyhub_core::{AuthUser, Database};
use uuid::Uuid;

use crate::bridge::AppHandle;
use crate::hooks::toast::Toaster;

/// Top-level app phase.
#[derive(Clone, Debug, PartialEq)]
pub enum AppPhase {
    /// Connecting and restoring the saved session
    Loading,
    /// Backend unreachable or misconfigured
    Failed(String),
    /// Connected, nobody signed in
    SignedOut(Arc<AppHandle>),
    /// Main app
    Running(Arc<AppHandle>),
}

/// Pages reachable from the navigation bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Discussions,
    Library,
    Upload,
    Groups,
    GroupChat(Uuid),
    Chat,
    Profile,
}

impl Route {
    /// Entries of the navigation bar, in order.
    pub const NAV: [Route; 7] = [
        Route::Dashboard,
        Route::Library,
        Route::Upload,
        Route::Discussions,
        Route::Groups,
        Route::Chat,
        Route::Profile,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Discussions => "Discussions",
            Route::Library => "Library",
            Route::Upload => "Upload",
            Route::Groups | Route::GroupChat(_) => "Groups",
            Route::Chat => "Chat",
            Route::Profile => "Profile",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Route::Dashboard => "🏠",
            Route::Discussions => "💬",
            Route::Library => "📚",
            Route::Upload => "⬆",
            Route::Groups | Route::GroupChat(_) => "👥",
            Route::Chat => "✉",
            Route::Profile => "👤",
        }
    }

    /// Whether the nav entry `self` is highlighted while `current` is shown.
    pub fn highlights(&self, current: Route) -> bool {
        match (self, current) {
            (Route::Groups, Route::GroupChat(_)) => true,
            _ => *self == current,
        }
    }
}

/// Shared state provided via Dioxus context once signed in.
#[derive(Clone, Copy, PartialEq)]
pub struct AppContext {
    pub handle: Signal<Arc<AppHandle>>,
    pub phase: Signal<AppPhase>,
    pub route: Signal<Route>,
    pub user: Signal<AuthUser>,
    pub profile: Signal<Option<Profile>>,
    pub toaster: Toaster,
}

impl AppContext {
    pub fn db(&self) -> Database {
        self.handle.read().db.clone()
    }

    pub fn user_id(&self) -> Uuid {
        self.user.read().id
    }

    pub fn navigate(&self, route: Route) {
        let mut current = self.route;
        current.set(route);
    }
}

/// The app context of the signed-in layout.
pub fn use_app() -> AppContext {
    use_context::<AppContext>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_chat_highlights_groups_tab() {
        let chat = Route::GroupChat(Uuid::new_v4());
        assert!(Route::Groups.highlights(chat));
        assert!(!Route::Chat.highlights(chat));
        assert!(Route::Library.highlights(Route::Library));
        assert_eq!(chat.label(), "Groups");
    }
}
