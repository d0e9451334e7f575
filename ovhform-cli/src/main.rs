use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;
mod http;
mod manifest;

use cli::{Args, Mode};
use config::Config;

/// Initialize tracing to stderr, or to a plain-text file when one is configured.
///
/// The returned guard must outlive every log call; dropping it stops the file writer.
fn initialize_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ovhform_convergence=debug".into());

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path {} has no file name", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .init();

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();

            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    let log_file = args.log_file.clone().or_else(|| config.log_file.clone());
    let _guard = initialize_tracing(log_file.as_deref())?;

    match args.mode {
        Mode::Apply { manifest, output } => {
            commands::apply::run(&config, &manifest, &output).await
        }
        Mode::Info { target, output } => {
            commands::info::run(&config, target, &output).await
        }
        Mode::Config { show_secrets } => {
            commands::config::show(&config, show_secrets)
        }
    }
}
