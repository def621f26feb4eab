//! # Orchestration
//!
//! Drives check passes over the probe registry and turns collected usage into verdicts.
//!
//! - [`LimitChecker`]: override application, concurrent usage collection, aggregation
//! - [`threshold_evaluator`]: per-limit comparison of usage against ceiling
//! - [`CheckReport`]: verdicts and service failures of one pass
//! - [`IamPolicy`]: permissions needed to run every probe

pub mod checker;
pub mod iam_policy;
pub mod threshold_evaluator;
pub mod types;

pub use checker::{LimitChecker, ProbeOutcome};
pub use iam_policy::{IamPolicy, IamStatement};
pub use threshold_evaluator::{classify, evaluate_limit, percent_of};
pub use types::{
    CheckReport, LimitReport, ReportStatus, ServiceFailure, ServiceFailureKind,
    ServiceLimitReports, Verdict,
};
