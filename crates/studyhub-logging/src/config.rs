//! Logging settings and the presets used by the app and by tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where log lines go and how verbose they are.
///
/// Deserializable so a `[logging]` table can sit next to the backend
/// settings; missing keys fall back to [`LogConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level directive used when `RUST_LOG` is unset.
    pub default_level: String,
    pub console: ConsoleConfig,
    /// Rolling JSONL files; off unless a directory is given.
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
    /// Extra `target=level` directives layered on top of the default level.
    pub targets: BTreeMap<String, String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
            targets: quiet_transport_targets(),
        }
    }
}

/// HTTP and websocket internals stay at `warn` even when the app runs at `debug`.
fn quiet_transport_targets() -> BTreeMap<String, String> {
    ["hyper", "hyper_util", "reqwest", "rustls", "tungstenite", "tokio_tungstenite"]
        .into_iter()
        .map(|t| (t.to_string(), "warn".to_string()))
        .collect()
}

impl LogConfig {
    /// What the desktop binary runs with: console at `level`, plus daily
    /// JSONL files under `log_dir` when one is given.
    pub fn desktop(level: impl Into<String>, log_dir: Option<PathBuf>) -> Self {
        let file = log_dir.map(|directory| FileConfig {
            directory,
            ..FileConfig::default()
        });
        // No color codes when a file copy exists.
        let ansi = file.is_none();
        Self {
            default_level: level.into(),
            console: ConsoleConfig {
                ansi,
                ..ConsoleConfig::default()
            },
            file,
            ..Default::default()
        }
    }

    /// Quiet, uncolored JSONL for test runs.
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: false,
                ansi: false,
            },
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines; JSONL otherwise.
    pub pretty: bool,
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: true,
            ansi: true,
        }
    }
}

/// Rolling log files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File names start with this, e.g. `studyhub.2026-10-18.jsonl`.
    pub prefix: String,
    pub rotation: RotationStrategy,
    /// Older rotated files are deleted beyond this count.
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "studyhub".to_string(),
            rotation: RotationStrategy::Daily,
            max_files: Some(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One `<prefix>.log` file, truncated on start.
    Never,
}

/// Shape of JSON lines, shared by the JSONL console and the files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Event fields at the top level instead of under `fields`.
    pub flatten_events: bool,
    pub include_spans: bool,
    /// Source file and line of each event.
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_quiets_transport_crates() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert!(config.file.is_none());
        assert_eq!(config.targets.get("tungstenite").map(String::as_str), Some("warn"));
    }

    #[test]
    fn test_desktop_without_log_dir_is_console_only() {
        let config = LogConfig::desktop("debug", None);
        assert_eq!(config.default_level, "debug");
        assert!(config.file.is_none());
        assert!(config.console.ansi);
    }

    #[test]
    fn test_desktop_with_log_dir_adds_daily_files() {
        let config = LogConfig::desktop("info", Some(PathBuf::from("/tmp/studyhub/logs")));
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/tmp/studyhub/logs"));
        assert_eq!(file.prefix, "studyhub");
        assert_eq!(file.rotation, RotationStrategy::Daily);
        assert!(!config.console.ansi);
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let config: LogConfig =
            serde_json::from_str(r#"{"default_level": "trace", "file": {"directory": "/var/log/studyhub"}}"#)
                .unwrap();
        assert_eq!(config.default_level, "trace");
        assert!(config.console.pretty);
        let file = config.file.unwrap();
        assert_eq!(file.max_files, Some(7));
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }
}
