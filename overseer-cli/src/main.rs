//! Overseer CLI

mod catalog;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overseer_config::{load_config, Config, LogFormat, LoggingConfig};
use overseer_runtime::{ModuleRegistry, SignalHandler, Supervisor, SupervisorConfig};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "overseer")]
#[command(about = "Overseer module supervision agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the initial modules and supervise them until stopped
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "overseer.yaml", env = "OVERSEER_CONFIG")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error), overrides the config
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "overseer.yaml", env = "OVERSEER_CONFIG")]
        config: PathBuf,
    },

    /// List built-in modules
    Modules,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, log_level } => {
            let path = config;
            let config = load_config(&path)
                .with_context(|| format!("loading {}", path.display()))?;

            let level = log_level.as_deref().unwrap_or(&config.logging.level);
            init_tracing(level, &config.logging)?;

            tracing::info!(config = %path.display(), "Starting Overseer");
            run(config).await
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Interval: {:?}", cfg.supervisor.interval);
                    tracing::info!(
                        "  Health check timeout: {:?}",
                        cfg.supervisor.health_check_timeout
                    );
                    tracing::info!(
                        "  Initial modules: {}",
                        cfg.supervisor.initial_modules.join(", ")
                    );
                    tracing::info!("  Configured modules: {}", cfg.modules.len());
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Modules => {
            for name in catalog::builtin_catalog(&Config::default()).names() {
                println!("{name}");
            }
            Ok(())
        }

        Commands::Version => {
            println!("Overseer");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let catalog = catalog::builtin_catalog(&config);
    let registry = ModuleRegistry::new(Arc::new(catalog));

    let supervisor_config = SupervisorConfig::default()
        .with_interval(config.supervisor.interval)
        .with_health_check_timeout(config.supervisor.health_check_timeout)
        .with_initial_modules(config.supervisor.initial_modules);

    let mut supervisor = Supervisor::new(registry, supervisor_config);

    let handler = SignalHandler::new(supervisor.handle());
    let signals = tokio::spawn(handler.run());

    let outcome = supervisor.start().await;
    signals.abort();

    for failure in supervisor.shutdown().await {
        tracing::error!(error = %failure, "Module cleanup failed during shutdown");
    }

    outcome.context("supervisor failed to start")?;
    tracing::info!("Overseer stopped");
    Ok(())
}

fn init_tracing(level: &str, logging: &LoggingConfig) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into());

    let (writer, ansi) = match &logging.file {
        Some(path) => (file_writer(path)?, false),
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    match logging.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(false)
                    .with_level(true),
            )
            .with(filter)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(false),
            )
            .with(filter)
            .try_init()?,
    }

    Ok(())
}

/// Append-mode writer for a log file, created if missing
fn file_writer(path: &Path) -> Result<BoxMakeWriter> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok(BoxMakeWriter::new(Arc::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_file_writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overseer.log");
        std::fs::write(&path, "first\n").unwrap();

        let writer = file_writer(&path).unwrap();
        writer.make_writer().write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_file_writer_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_writer(&dir.path().join("missing").join("overseer.log")).unwrap_err();
        assert!(err.to_string().contains("opening log file"));
    }
}
