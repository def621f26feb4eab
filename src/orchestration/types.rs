//! # Orchestration Types
//!
//! The verdict of a single limit and the aggregate report of a check pass. A report
//! keeps threshold verdicts and service failures in separate maps so "near or over the
//! limit" is never confused with "could not be checked".

use crate::error::{CheckerResult, EvaluationError, FetchFailureKind, LimitCheckerError};
use crate::models::{EffectiveThresholds, LimitClass, LimitSource, UsageObservation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Classification of one limit after comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    Warning,
    Critical,
    /// The ceiling is zero or unknown; no comparison was possible
    CannotEvaluate,
}

impl Verdict {
    pub fn is_threshold_crossed(&self) -> bool {
        matches!(self, Verdict::Warning | Verdict::Critical)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Ok => "OK",
            Verdict::Warning => "WARNING",
            Verdict::Critical => "CRITICAL",
            Verdict::CannotEvaluate => "CANNOT EVALUATE",
        };
        f.write_str(label)
    }
}

/// Verdict of one limit together with the usage it was based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitReport {
    pub service: String,
    pub limit: String,
    pub verdict: Verdict,
    pub class: LimitClass,
    /// Observation count or max observed value, depending on `class`
    pub usage: f64,
    pub ceiling: Option<u64>,
    pub limit_source: LimitSource,
    pub percent_used: Option<f64>,
    pub thresholds: EffectiveThresholds,
    pub observations: Vec<UsageObservation>,
    pub evaluation_error: Option<EvaluationError>,
}

/// Severity across every evaluated limit, ignoring service failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFailureKind {
    Connection,
    Fetch,
    Timeout,
    Panicked,
    Internal,
}

/// Why a service could not be checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFailure {
    pub kind: ServiceFailureKind,
    pub fetch_kind: Option<FetchFailureKind>,
    pub message: String,
}

impl ServiceFailure {
    pub fn panicked<M: fmt::Display>(message: M) -> Self {
        Self {
            kind: ServiceFailureKind::Panicked,
            fetch_kind: None,
            message: message.to_string(),
        }
    }
}

impl From<&LimitCheckerError> for ServiceFailure {
    fn from(error: &LimitCheckerError) -> Self {
        let (kind, fetch_kind) = match error {
            LimitCheckerError::ConnectionError { .. } => (ServiceFailureKind::Connection, None),
            LimitCheckerError::FetchError { kind, .. } => (ServiceFailureKind::Fetch, Some(*kind)),
            LimitCheckerError::Timeout { .. } => (ServiceFailureKind::Timeout, None),
            _ => (ServiceFailureKind::Internal, None),
        };
        Self {
            kind,
            fetch_kind,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Limit reports of one service keyed by limit name
pub type ServiceLimitReports = BTreeMap<String, LimitReport>;

/// Aggregate result of a check pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub check_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    services: BTreeMap<String, ServiceLimitReports>,
    errors: BTreeMap<String, ServiceFailure>,
}

impl Default for CheckReport {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckReport {
    pub fn new() -> Self {
        Self {
            check_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            services: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    fn ensure_unrecorded(&self, service: &str) -> CheckerResult<()> {
        if self.services.contains_key(service) || self.errors.contains_key(service) {
            return Err(LimitCheckerError::Internal(format!(
                "service {service} already has a report entry"
            )));
        }
        Ok(())
    }

    /// Add the evaluated limits of a service; each service may be recorded once
    pub fn record_service<S: Into<String>>(
        &mut self,
        service: S,
        reports: ServiceLimitReports,
    ) -> CheckerResult<()> {
        let service = service.into();
        self.ensure_unrecorded(&service)?;
        self.services.insert(service, reports);
        Ok(())
    }

    /// Add the failure of a service; each service may be recorded once
    pub fn record_error<S: Into<String>>(
        &mut self,
        service: S,
        failure: ServiceFailure,
    ) -> CheckerResult<()> {
        let service = service.into();
        self.ensure_unrecorded(&service)?;
        self.errors.insert(service, failure);
        Ok(())
    }

    /// Fold another report's entries into this one; overlapping services are rejected
    /// before anything is merged
    pub fn merge(&mut self, other: CheckReport) -> CheckerResult<()> {
        for service in other.services.keys().chain(other.errors.keys()) {
            self.ensure_unrecorded(service)?;
        }
        self.services.extend(other.services);
        self.errors.extend(other.errors);
        if let (Some(ours), Some(theirs)) = (self.completed_at, other.completed_at) {
            self.completed_at = Some(ours.max(theirs));
        }
        Ok(())
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceLimitReports> {
        &self.services
    }

    pub fn service(&self, service: &str) -> Option<&ServiceLimitReports> {
        self.services.get(service)
    }

    pub fn limit(&self, service: &str, limit: &str) -> Option<&LimitReport> {
        self.services.get(service).and_then(|limits| limits.get(limit))
    }

    pub fn errors(&self) -> &BTreeMap<String, ServiceFailure> {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn with_verdict(&self, verdict: Verdict) -> Vec<&LimitReport> {
        self.services
            .values()
            .flat_map(|limits| limits.values())
            .filter(|report| report.verdict == verdict)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&LimitReport> {
        self.with_verdict(Verdict::Warning)
    }

    pub fn criticals(&self) -> Vec<&LimitReport> {
        self.with_verdict(Verdict::Critical)
    }

    pub fn unevaluable(&self) -> Vec<&LimitReport> {
        self.with_verdict(Verdict::CannotEvaluate)
    }

    pub fn status(&self) -> ReportStatus {
        if !self.criticals().is_empty() {
            ReportStatus::Critical
        } else if !self.warnings().is_empty() {
            ReportStatus::Warning
        } else {
            ReportStatus::Ok
        }
    }
}
