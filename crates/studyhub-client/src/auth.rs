//! Password auth against the auth endpoint (`/auth/v1`).

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use studyhub_core::{AuthUser, CoreError, Session};
use uuid::Uuid;

use crate::client::StudyHubClient;
use crate::error::{ClientError, Result, check};

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Body of a token grant or of a sign-up with auto-confirm.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserBody>,
    // Sign-up without auto-confirm returns the bare user.
    #[serde(default)]
    id: Option<Uuid>,
}

impl TokenResponse {
    /// Convert into a session, stamping expiry relative to `now`.
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> Result<Session> {
        let Some(access_token) = self.access_token else {
            return Err(if self.id.is_some() {
                ClientError::ConfirmationRequired
            } else {
                ClientError::Decode("token response without access_token".to_string())
            });
        };
        let user = self
            .user
            .ok_or_else(|| ClientError::Decode("token response without user".to_string()))?;
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(now + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };
        Ok(Session {
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: AuthUser {
                id: user.id,
                email: user.email,
            },
        })
    }
}

/// Map auth failures onto the actionable core variants.
pub(crate) fn auth_error(e: ClientError, email: &str) -> CoreError {
    if let ClientError::Api { status, message } = &e {
        let lower = message.to_lowercase();
        if (*status == 400 || *status == 401) && lower.contains("invalid login") {
            return CoreError::InvalidCredentials;
        }
        if lower.contains("already registered") || lower.contains("already been registered") {
            return CoreError::AlreadyRegistered {
                email: email.to_string(),
            };
        }
        if *status == 422 || *status == 400 {
            return CoreError::Validation(message.clone());
        }
    }
    e.into()
}

impl StudyHubClient {
    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config().base_url(), path)
    }

    pub(crate) async fn auth_password_grant(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .request(Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = check(request.send().await?).await?;
        let body: TokenResponse = response.json().await?;
        body.into_session(Utc::now())
    }

    pub(crate) async fn auth_refresh(&self, refresh_token: &str) -> Result<Session> {
        let request = self
            .request(Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let response = check(request.send().await?).await?;
        let body: TokenResponse = response.json().await?;
        body.into_session(Utc::now())
    }

    pub(crate) async fn auth_sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Session> {
        let request = self
            .request(Method::POST, &self.auth_url("signup"))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }));
        let response = check(request.send().await?).await?;
        let body: TokenResponse = response.json().await?;
        body.into_session(Utc::now())
    }

    pub(crate) async fn auth_logout(&self) -> Result<()> {
        let request = self.request(Method::POST, &self.auth_url("logout"));
        match check(request.send().await?).await {
            Ok(_) => Ok(()),
            // Token already revoked or expired: nothing left to log out.
            Err(ClientError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
