//! Backend connection settings.
//!
//! Loaded from a TOML file, then overridden by environment variables so a
//! deployment can swap projects without editing the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// Environment variable overriding [`BackendConfig::url`].
pub const URL_ENV: &str = "STUDYHUB_URL";
/// Environment variable overriding [`BackendConfig::anon_key`].
pub const ANON_KEY_ENV: &str = "STUDYHUB_ANON_KEY";

/// Default object storage bucket for lecture materials.
pub const DEFAULT_BUCKET: &str = "lecture-files";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anonymous) API key sent with every request.
    pub anon_key: String,
    /// Bucket used for uploaded files.
    pub storage_bucket: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Realtime heartbeat period.
    pub heartbeat_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            storage_bucket: DEFAULT_BUCKET.to_string(),
            request_timeout_secs: 30,
            heartbeat_interval_secs: 30,
        }
    }
}

impl BackendConfig {
    /// Create a configuration for a project URL and key.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Build purely from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `STUDYHUB_URL` / `STUDYHUB_ANON_KEY`.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV) {
            self.url = url;
        }
        if let Ok(key) = std::env::var(ANON_KEY_ENV) {
            self.anon_key = key;
        }
    }

    /// Set the storage bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = bucket.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "backend url is empty (set `url` or {URL_ENV})"
            )));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(CoreError::Config(format!(
                "backend url must be http(s): {}",
                self.url
            )));
        }
        if self.anon_key.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "anon key is empty (set `anon_key` or {ANON_KEY_ENV})"
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = BackendConfig::from_toml_str(
            r#"
            url = "https://demo.example.co/"
            anon_key = "public-key"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://demo.example.co");
        assert_eq!(config.storage_bucket, DEFAULT_BUCKET);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(BackendConfig::default().validate().is_err());
        assert!(BackendConfig::new("ftp://x", "k").validate().is_err());
        assert!(BackendConfig::new("https://x", " ").validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = BackendConfig::from_toml_str("url = [").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studyhub.toml");
        std::fs::write(
            &path,
            "url = \"http://localhost:54321\"\nanon_key = \"k\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();
        let config = BackendConfig::load(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
    }
}
