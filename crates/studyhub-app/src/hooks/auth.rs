//! Sign-in, registration and the signed-in user's profile.

use std::sync::Arc;

use dioxus::prelude::*;
use studyhub_core::model::{Profile, ProfilePatch};
use studyhub_core::query::Filter;
use studyhub_core::{Backend, CoreError, Database, Session};
use uuid::Uuid;

use super::{HookError, HookResult, required};
use crate::bridge::AppHandle;
use crate::state::{AppContext, AppPhase, use_app};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> HookResult<Session> {
        let email = required(email, "Email")?;
        if password.is_empty() {
            return Err(HookError::Required("Password"));
        }
        let session = self.db.backend().sign_in(&email, password).await?;
        tracing::info!(user = %session.user.id, "Signed in");
        Ok(session)
    }

    pub async fn sign_up(&self, full_name: &str, email: &str, password: &str) -> HookResult<Session> {
        let full_name = required(full_name, "Full name")?;
        let email = required(email, "Email")?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }
        let session = self.db.backend().sign_up(&email, password, &full_name).await?;
        tracing::info!(user = %session.user.id, "Account created");
        Ok(session)
    }

    pub async fn sign_out(&self) -> HookResult<()> {
        self.db.backend().sign_out().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Profile of `user_id`, `None` when the row does not exist yet.
    pub async fn load_profile(&self, user_id: Uuid) -> HookResult<Option<Profile>> {
        match self.db.get::<Profile>(user_id).await {
            Ok(profile) => Ok(Some(profile)),
            Err(CoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `patch` to the signed-in user's profile.
    pub async fn update_profile(&self, mut patch: ProfilePatch) -> HookResult<Profile> {
        let user = self.db.require_user()?;
        if let Some(name) = &patch.full_name {
            patch.full_name = Some(required(name, "Full name")?);
        }
        for field in [&mut patch.bio, &mut patch.department, &mut patch.level] {
            if let Some(value) = field.as_mut() {
                *value = value.trim().to_string();
            }
        }
        if patch.is_empty() {
            return Ok(self.db.get(user.id).await?);
        }
        let updated: Vec<Profile> = self
            .db
            .update(vec![Filter::eq("id", user.id.to_string())], &patch)
            .await?;
        let profile = updated
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found("profiles", user.id))?;
        tracing::info!(user = %user.id, "Profile updated");
        Ok(profile)
    }
}

/// Move from the sign-in screen into the app.
pub fn enter_app(mut phase: Signal<AppPhase>, handle: Arc<AppHandle>, session: &Session) {
    handle.persist(session);
    phase.set(AppPhase::Running(handle));
}

/// Profile actions of the signed-in layout.
#[derive(Clone, Copy, PartialEq)]
pub struct UseAuth {
    app: AppContext,
    pub saving: Signal<bool>,
}

pub fn use_auth() -> UseAuth {
    let app = use_app();
    let saving = use_signal(|| false);
    UseAuth { app, saving }
}

impl UseAuth {
    fn service(&self) -> AuthService {
        AuthService::new(self.app.db())
    }

    /// Reload the signed-in user's profile into context.
    pub async fn load_profile(&self) {
        let mut profile = self.app.profile;
        match self.service().load_profile(self.app.user_id()).await {
            Ok(p) => profile.set(p),
            Err(e) => tracing::error!(error = %e, "Error fetching profile"),
        }
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> bool {
        let (mut saving, mut profile) = (self.saving, self.app.profile);
        saving.set(true);
        let result = self.service().update_profile(patch).await;
        saving.set(false);
        match result {
            Ok(updated) => {
                profile.set(Some(updated));
                self.app.toaster.success("Profile updated successfully");
                true
            }
            Err(e) => {
                self.app.toaster.error("Failed to update profile", &e);
                false
            }
        }
    }

    /// Sign out, forget the saved session and return to the sign-in screen.
    pub async fn sign_out(&self) {
        let handle = self.app.handle.read().clone();
        if let Err(e) = self.service().sign_out().await {
            tracing::warn!(error = %e, "Sign-out request failed");
        }
        handle.sessions().clear();
        let mut phase = self.app.phase;
        phase.set(AppPhase::SignedOut(handle));
    }
}
