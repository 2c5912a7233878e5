//! Octomatic telemetry CLI.
//!
//! Drives the telemetry services from the command line: validate a
//! configuration, push a log entry or an error through the same path the
//! site uses, or print a performance summary from recorded observer entries.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────── Telemetry ─────────────────────────────┐
//!                 │                                                                      │
//!   log call ─────┼─▶ Logger ──── console mirror (tracing)                               │
//!                 │     │  └───── WARN/ERROR queue ──▶ batch ──▶ Transport ──▶ logging    │
//!                 │     ▲                                                      endpoint  │
//!   error ────────┼─▶ ErrorHandler ── rate limit ── report ──▶ Transport ──▶ monitoring │
//!                 │     │                           └── recovery strategies  endpoint   │
//!                 │     ▲                                                                │
//!   entries ──────┼─▶ PerformanceMonitor ── ring buffer ── Web Vitals ── summary         │
//!                 │                                                                      │
//!                 │  ┌──────────────────────────────────────────────────────────────┐   │
//!                 │  │ Cross-cutting: config · platform · lifecycle · observability  │   │
//!                 │  └──────────────────────────────────────────────────────────────┘   │
//!                 └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use octomatic_telemetry::config::{from_env, load_config};
use octomatic_telemetry::lifecycle::signals::shutdown_signal;
use octomatic_telemetry::observability::{logging::init_tracing, metrics::init_metrics};
use octomatic_telemetry::performance::PerformanceEntry;
use octomatic_telemetry::platform::HostPlatform;
use octomatic_telemetry::transport::{MemoryTransport, Transport};
use octomatic_telemetry::{AppError, LifecycleEvent, LogLevel, Telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "octomatic-telemetry")]
#[command(about = "Client telemetry for the Octomatic site", long_about = None)]
struct Cli {
    /// Configuration file. Environment defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a configuration file
    Check { path: PathBuf },
    /// Emit one log entry, then flush as on unload
    Log {
        #[arg(short, long, default_value = "info")]
        level: LogLevel,
        #[arg(long)]
        context: Option<String>,
        /// Deliver into memory and print the payload instead of posting it
        #[arg(long)]
        dry_run: bool,
        message: String,
    },
    /// Route one error through the error handler
    Report {
        #[arg(long, value_enum, default_value_t = ReportKind::Generic)]
        kind: ReportKind,
        #[arg(long)]
        context: Option<String>,
        message: String,
    },
    /// Print a performance summary, optionally from a JSON file of observer entries
    Summary {
        #[arg(long)]
        entries: Option<PathBuf>,
        /// Keep sampling until Ctrl-C, then print
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Network,
    Validation,
    Authentication,
    Authorization,
    BusinessLogic,
    ExternalService,
    Generic,
}

impl ReportKind {
    fn build(self, message: String) -> AppError {
        match self {
            ReportKind::Network => AppError::network(message),
            ReportKind::Validation => AppError::validation(message),
            ReportKind::Authentication => AppError::authentication(message),
            ReportKind::Authorization => AppError::authorization(message),
            ReportKind::BusinessLogic => AppError::business_logic(message),
            ReportKind::ExternalService => AppError::external_service("cli", message),
            ReportKind::Generic => AppError::new(message),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => from_env()?,
    };

    init_tracing(&config.observability);
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr);
    }

    tracing::debug!(environment = %config.environment, "octomatic-telemetry v0.1.0 starting");

    match cli.command {
        Commands::Check { path } => {
            let checked = load_config(&path)?;
            println!("{}", toml::to_string_pretty(&checked)?);
            println!("Configuration OK: {}", path.display());
        }
        Commands::Log {
            level,
            context,
            dry_run,
            message,
        } => {
            let (telemetry, memory) = build(config, dry_run)?;
            telemetry.logger().log(level, message, context.as_deref(), None);

            let outcome = telemetry.dispatch(LifecycleEvent::Unload).await;
            println!("Flush outcome: {:?}", outcome);
            if let Some(memory) = memory {
                for payload in memory.delivered() {
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
            }
        }
        Commands::Report {
            kind,
            context,
            message,
        } => {
            let telemetry = Telemetry::from_config(config, Arc::new(HostPlatform::new()))?;
            let error = kind.build(message);
            let recovered = telemetry
                .error_handler()
                .handle_app_error(error, context.as_deref(), true)
                .await;
            telemetry.shutdown().await;
            println!("Recovered: {}", recovered.is_some());
        }
        Commands::Summary { entries, watch } => {
            let platform = Arc::new(HostPlatform::with_all_entry_types());
            let telemetry = Telemetry::from_config(config, platform)?;
            telemetry.start();

            if let Some(path) = entries {
                let raw = std::fs::read_to_string(&path)?;
                let entries: Vec<PerformanceEntry> = serde_json::from_str(&raw)?;
                tracing::info!(count = entries.len(), path = %path.display(), "Replaying observer entries");
                for entry in entries {
                    telemetry.performance().observe(entry);
                }
            }
            telemetry.performance().on_load();

            if watch {
                shutdown_signal().await;
            }

            let summary = telemetry.performance().performance_summary();
            telemetry.shutdown().await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Telemetry for one-shot commands. A dry run forces remote logging on and
/// captures payloads in memory.
fn build(
    mut config: TelemetryConfig,
    dry_run: bool,
) -> Result<(Telemetry, Option<Arc<MemoryTransport>>), Box<dyn std::error::Error>> {
    let platform = Arc::new(HostPlatform::new());
    if !dry_run {
        return Ok((Telemetry::from_config(config, platform)?, None));
    }

    config.logger.enable_remote_logging = true;
    let memory = Arc::new(MemoryTransport::new());
    let logging: Arc<dyn Transport> = memory.clone();
    let telemetry = Telemetry::with_transports(config, platform, Some(logging), None);
    Ok((telemetry, Some(memory)))
}
