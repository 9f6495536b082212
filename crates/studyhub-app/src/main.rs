//! Entry point for the StudyHub desktop app.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dioxus::desktop::{Config, LogicalSize, WindowBuilder};
use studyhub_app::bridge::{LaunchSettings, default_data_dir};
use studyhub_app::{STUDYHUB_CSS, components};
use studyhub_logging::{LogConfig, StudyHubSubscriberBuilder};

/// StudyHub: lecture files, discussions, study groups and chat.
#[derive(Debug, Parser)]
#[command(name = "studyhub", version, about)]
struct Args {
    /// Backend config file (TOML); STUDYHUB_* environment variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against a seeded in-memory backend
    #[arg(long)]
    offline: bool,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write JSONL logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Where the session and downloads are kept
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = StudyHubSubscriberBuilder::new()
        .with_config(LogConfig::desktop(args.log_level.clone(), args.log_dir.clone()))
        .try_init()
        .context("Failed to initialize logging")?;

    let settings = LaunchSettings {
        config_path: args.config,
        offline: args.offline,
        data_dir: args.data_dir.unwrap_or_else(default_data_dir),
    };

    let window_title = if settings.offline {
        "StudyHub (offline demo)".to_string()
    } else {
        "StudyHub".to_string()
    };
    tracing::info!(offline = settings.offline, data_dir = %settings.data_dir.display(), "Starting {}", window_title);

    let wb = WindowBuilder::new()
        .with_title(&window_title)
        .with_inner_size(LogicalSize::new(1200.0, 800.0))
        .with_maximized(false);

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            Config::new()
                .with_window(wb)
                .with_custom_head(format!(r#"<style>{}</style>"#, STUDYHUB_CSS)),
        )
        .with_context(settings)
        .launch(components::app::App);

    Ok(())
}
