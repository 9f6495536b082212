//! Console and JSONL file logging for StudyHub
//!
//! # Features
//!
//! - **Pretty console output** for interactive runs, or JSONL when piped
//! - **JSONL file output** with daily/hourly rotation via tracing-appender
//! - **Target overrides** so transport crates stay quiet at debug level
//!
//! # Quick Start
//!
//! ```ignore
//! use studyhub_logging::{LogConfig, StudyHubSubscriberBuilder};
//!
//! // Keep the guard alive until exit so buffered file lines are flushed.
//! let _guard = StudyHubSubscriberBuilder::new()
//!     .with_config(LogConfig::desktop("debug", None))
//!     .init();
//!
//! tracing::info!("StudyHub starting");
//! ```

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, File};
use std::io;

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Log directory or file could not be created.
    #[error("Cannot open log output: {0}")]
    Io(#[from] io::Error),

    /// Rolling appender rejected its settings.
    #[error("Cannot create rolling log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// A level directive did not parse.
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the StudyHub logging subscriber
///
/// By default, console output is pretty and colored. Use
/// [`LogConfig::desktop`] with a log directory to add rotating JSONL files.
pub struct StudyHubSubscriberBuilder {
    config: LogConfig,
}

impl StudyHubSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        let mut filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.config.default_level))?;
        for (target, level) in &self.config.targets {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
        Ok(filter)
    }

    /// Build the subscriber without installing it.
    ///
    /// The returned guard (present when file output is on) must outlive
    /// every log call that should reach the file.
    pub fn build(
        self,
    ) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>), LogError> {
        let filter = self.env_filter()?;
        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
        });

        let json_console = (console.enabled && !console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
        });

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(jsonl.include_spans)
                    .flatten_event(jsonl.flatten_events)
                    .with_file(jsonl.include_location)
                    .with_line_number(jsonl.include_location)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let subscriber = Registry::default()
            .with(filter)
            .with(pretty_console)
            .with(json_console)
            .with(file_layer);
        Ok((subscriber, guard))
    }

    /// Try to initialize the subscriber globally
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let (subscriber, guard) = self.build()?;
        subscriber.try_init()?;
        Ok(guard)
    }

    /// Initialize the subscriber globally
    ///
    /// Failures are reported on stderr and leave logging off; the app keeps
    /// running without it.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: failed to initialize logging: {e}");
                None
            }
        }
    }
}

impl Default for StudyHubSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking writer for file output. `Never` truncates a single file;
/// the rotating strategies append.
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&config.directory)?;
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("jsonl");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for testing (minimal output, ignores double init)
pub fn init_testing() {
    let _ = StudyHubSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = StudyHubSubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_level() {
        let builder = StudyHubSubscriberBuilder::new().with_level("trace");
        assert_eq!(builder.config.default_level, "trace");
    }

    #[test]
    fn test_builder_with_console() {
        let builder = StudyHubSubscriberBuilder::new().with_console(false);
        assert!(!builder.config.console.enabled);
    }

    #[test]
    fn test_bad_target_level_is_rejected() {
        let mut config = LogConfig::default();
        config.targets.insert("studyhub".into(), "loud".into());
        let result = StudyHubSubscriberBuilder::new().with_config(config).build();
        assert!(matches!(result, Err(LogError::Filter(_))));
    }
}
