#![allow(clippy::doc_markdown)] // Allow technical terms like WorkSpaces, AppStream in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Limit Checker
//!
//! Checks how close a cloud account is to its per-service resource quotas.
//!
//! ## Overview
//!
//! Every service probe declares the limits its service imposes, fetches the account's
//! inventory through a read-only data source and records one usage observation per
//! counted resource. The orchestrator runs the probes concurrently, compares each
//! limit's usage with its effective ceiling and returns a report that separates
//! threshold verdicts from services that could not be checked.
//!
//! ## Module Organization
//!
//! - [`models`] - Limits, ceilings, thresholds and usage observations
//! - [`services`] - Service probes and the probe registry
//! - [`connection`] - Data-source traits, pagination and the snapshot source
//! - [`orchestration`] - Check passes, threshold evaluation and reports
//! - [`config`] - Layered configuration (defaults, TOML file, environment)
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Limit resolution
//!
//! A limit's effective ceiling is the user override, else the value reported by the
//! provider API, else the built-in default. Count limits measure the number of
//! observations; instance-value limits measure the largest single observation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use limit_checker::config::CheckerConfig;
//! use limit_checker::connection::{Snapshot, SnapshotConnector};
//! use limit_checker::orchestration::LimitChecker;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = Snapshot::from_file("snapshot.json")?;
//! let mut checker = LimitChecker::new(
//!     &CheckerConfig::default(),
//!     Arc::new(SnapshotConnector::new(snapshot)),
//! )?;
//! checker.set_limit_override("WorkSpaces", "Bundles", 25, true)?;
//!
//! let report = checker.check_thresholds(None, &CancellationToken::new()).await?;
//! for limit in report.criticals() {
//!     println!("{}/{}: {:?} of {:?}", limit.service, limit.limit, limit.usage, limit.ceiling);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;

pub use config::{CheckerConfig, ConfigManager, ConfigurationError};
pub use connection::{Connector, DataSource, Page, Paginator, Snapshot, SnapshotConnector};
pub use error::{CheckerResult, EvaluationError, FetchFailureKind, LimitCheckerError};
pub use models::{Limit, LimitClass, LimitSource, LimitSpec, ThresholdOverride, UsageObservation};
pub use orchestration::{
    CheckReport, IamPolicy, LimitChecker, LimitReport, ReportStatus, ServiceFailure,
    ServiceFailureKind, Verdict,
};
pub use services::{LimitMap, Probe, ProbeRegistry, ServiceProbe};
