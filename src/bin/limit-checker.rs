//! # Limit Checker CLI
//!
//! Command-line front end for checking account usage against service limits. Usage
//! data is read from a recorded snapshot of provider responses.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use limit_checker::config::{CheckerConfig, ConfigManager, LimitOverrideEntry};
use limit_checker::connection::{Snapshot, SnapshotConnector};
use limit_checker::constants::exit_codes;
use limit_checker::logging::init_structured_logging;
use limit_checker::orchestration::{CheckReport, LimitChecker, ReportStatus, Verdict};
use limit_checker::LimitCheckerError;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "limit-checker")]
#[command(about = "Check cloud account usage against service limits")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded provider responses to check against
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect usage and report limits at or above their thresholds
    Check {
        /// Only check this service (repeatable)
        #[arg(long = "service")]
        services: Vec<String>,

        /// Override a limit ceiling as Service.Limit=value (repeatable)
        #[arg(long = "limit")]
        limits: Vec<LimitOverrideEntry>,

        /// Default warning threshold percent
        #[arg(short = 'W', long)]
        warning_threshold: Option<u8>,

        /// Default critical threshold percent
        #[arg(short = 'C', long)]
        critical_threshold: Option<u8>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show every limit with its effective ceiling and where it came from
    ListLimits {
        #[arg(long = "service")]
        services: Vec<String>,
    },

    /// Show the names of every checkable service
    ListServices,

    /// Print the IAM policy needed to run every probe
    IamPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!(error = %e, "limit-checker failed");
            eprintln!("Error: {e:#}");
            process::exit(exit_codes::CRITICAL);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;
    let mut config = manager.config().clone();

    let snapshot = match &cli.snapshot {
        Some(path) => Snapshot::from_file(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?,
        None => Snapshot::default(),
    };

    match cli.command {
        Commands::Check {
            services,
            limits,
            warning_threshold,
            critical_threshold,
            format,
        } => {
            if cli.snapshot.is_none() {
                bail!("check needs usage data: pass --snapshot FILE");
            }
            if let Some(warning) = warning_threshold {
                config.thresholds.warning = warning;
            }
            if let Some(critical) = critical_threshold {
                config.thresholds.critical = critical;
            }
            config.merge_limit_overrides(limits);

            let checker = build_checker(&config, snapshot)?;
            let filter = (!services.is_empty()).then_some(services);

            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling check");
                    interrupt.cancel();
                }
            });

            let report = match checker.check_thresholds(filter.as_deref(), &cancel).await {
                Ok(report) => report,
                Err(LimitCheckerError::Cancelled) => {
                    eprintln!("Check cancelled");
                    return Ok(exit_codes::CRITICAL);
                }
                Err(e) => return Err(e.into()),
            };

            match format {
                OutputFormat::Text => print_report(&report),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("failed to render report")?
                ),
            }
            Ok(exit_code(&report))
        }
        Commands::ListLimits { services } => {
            let checker = build_checker(&config, snapshot)?;
            let filter = (!services.is_empty()).then_some(services);
            for (service, limits) in checker.get_limits(filter.as_deref())? {
                for (name, limit) in limits {
                    let ceiling = limit
                        .get_limit()
                        .map_or_else(|| "unlimited".to_string(), |value| value.to_string());
                    println!(
                        "{service}/{name}\t{ceiling}\t({:?})",
                        limit.get_limit_source()
                    );
                }
            }
            Ok(exit_codes::OK)
        }
        Commands::ListServices => {
            let checker = build_checker(&config, snapshot)?;
            for service in checker.service_names() {
                println!("{service}");
            }
            Ok(exit_codes::OK)
        }
        Commands::IamPolicy => {
            let checker = build_checker(&config, snapshot)?;
            println!("{}", checker.get_required_iam_policy().to_json_pretty()?);
            Ok(exit_codes::OK)
        }
    }
}

fn build_checker(config: &CheckerConfig, snapshot: Snapshot) -> Result<LimitChecker> {
    LimitChecker::new(config, Arc::new(SnapshotConnector::new(snapshot)))
        .context("invalid checker configuration")
}

fn exit_code(report: &CheckReport) -> i32 {
    if report.has_errors() {
        return exit_codes::CRITICAL;
    }
    match report.status() {
        ReportStatus::Ok => exit_codes::OK,
        ReportStatus::Warning => exit_codes::WARNING,
        ReportStatus::Critical => exit_codes::CRITICAL,
    }
}

fn print_report(report: &CheckReport) {
    for (service, limits) in report.services() {
        for limit in limits.values() {
            match limit.verdict {
                Verdict::Ok => {}
                Verdict::CannotEvaluate => {
                    if limit.usage > 0.0 {
                        println!(
                            "{service}/{} (limit unknown or zero) {} usage {}",
                            limit.limit, limit.verdict, limit.usage
                        );
                    }
                }
                Verdict::Warning | Verdict::Critical => {
                    let ceiling = limit.ceiling.unwrap_or_default();
                    let percent = limit.percent_used.unwrap_or_default();
                    println!(
                        "{service}/{} (limit {ceiling}) {}: {} ({percent:.1}%)",
                        limit.limit, limit.verdict, limit.usage
                    );
                }
            }
        }
    }
    for (service, failure) in report.errors() {
        println!("{service} ERROR: {failure}");
    }
}
