//! User profiles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Table, tables};

/// Public profile of a user, keyed by the auth user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Table for Profile {
    const NAME: &'static str = tables::PROFILES;
}

impl Profile {
    /// A blank profile for a freshly registered user.
    pub fn new(id: Uuid, full_name: Option<String>, email: Option<String>) -> Self {
        Self {
            id,
            full_name,
            avatar_url: None,
            role: Some("student".to_string()),
            department: None,
            level: None,
            bio: None,
            email,
        }
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Student")
    }

    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Author details embedded into rows that reference a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.full_name.as_deref().unwrap_or(fallback)
    }
}

/// Editable profile fields. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
