//! # Limit Checker Configuration
//!
//! Configuration is supplied before orchestration starts and is never consulted again
//! once a pass is running.
//!
//! ## Layout
//!
//! ```toml
//! [thresholds]
//! warning = 80
//! critical = 99
//!
//! [execution]
//! max_concurrent_probes = 4
//! probe_timeout_ms = 300000
//!
//! [[service_thresholds]]
//! service = "WorkSpaces"
//! warning = 70
//! critical = 90
//!
//! [[limit_overrides]]
//! service = "WorkSpaces"
//! limit = "Images"
//! value = 40
//!
//! [[threshold_overrides]]
//! service = "AppStream"
//! limit = "Fleets"
//! warning_count = 8
//! ```
//!
//! Service and limit names are carried as values rather than table keys so that key
//! normalisation in the layered loader never alters them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use limit_checker::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("limit-checker.toml")?;
//! let workers = manager.config().execution.max_concurrent_probes;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{execution, thresholds};
use crate::models::ThresholdOverride;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Global warning/critical percentages inherited by every service
    pub thresholds: ThresholdConfig,

    /// Probe execution settings
    pub execution: ExecutionConfig,

    /// Per-service threshold defaults replacing the global ones
    pub service_thresholds: Vec<ServiceThresholdEntry>,

    /// User-supplied ceilings keyed by service and limit
    pub limit_overrides: Vec<LimitOverrideEntry>,

    /// Per-limit threshold overrides
    pub threshold_overrides: Vec<ThresholdOverrideEntry>,
}

/// Warning and critical percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThresholdConfig {
    pub warning: u8,
    pub critical: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning: thresholds::DEFAULT_WARNING_PERCENT,
            critical: thresholds::DEFAULT_CRITICAL_PERCENT,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self, scope: &str) -> ConfigResult<()> {
        validate_percent_pair(scope, Some(self.warning), Some(self.critical))
    }
}

/// Probe execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Probes allowed to collect usage at once; 1 runs them sequentially
    pub max_concurrent_probes: usize,
    /// Wall-clock budget for one probe's usage collection
    pub probe_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: execution::DEFAULT_MAX_CONCURRENT_PROBES,
            probe_timeout_ms: execution::DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl ExecutionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Threshold defaults for a single service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceThresholdEntry {
    pub service: String,
    pub warning: u8,
    pub critical: u8,
}

/// A user-supplied ceiling for one limit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitOverrideEntry {
    pub service: String,
    pub limit: String,
    pub value: u64,
    /// Whether the override also beats a ceiling reported by the provider API
    #[serde(default = "default_override_ta")]
    pub override_ta: bool,
}

fn default_override_ta() -> bool {
    true
}

impl LimitOverrideEntry {
    pub fn new<S: Into<String>, L: Into<String>>(service: S, limit: L, value: u64) -> Self {
        Self {
            service: service.into(),
            limit: limit.into(),
            value,
            override_ta: true,
        }
    }
}

/// Parses `Service.Limit=value`
impl FromStr for LimitOverrideEntry {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s.rsplit_once('=').ok_or_else(|| {
            ConfigurationError::invalid_value("limit_override", s, "expected Service.Limit=value")
        })?;
        let (service, limit) = parse_override_key(key)?;
        let value = value.trim().parse::<u64>().map_err(|e| {
            ConfigurationError::invalid_value("limit_override", value, e.to_string())
        })?;
        Ok(Self::new(service, limit, value))
    }
}

/// Split a `Service.Limit` key on its first dot; limit names may contain dots
pub fn parse_override_key(key: &str) -> ConfigResult<(String, String)> {
    match key.trim().split_once('.') {
        Some((service, limit)) if !service.is_empty() && !limit.is_empty() => {
            Ok((service.to_string(), limit.to_string()))
        }
        _ => Err(ConfigurationError::invalid_value(
            "limit_override",
            key,
            "expected Service.Limit",
        )),
    }
}

/// Per-limit threshold override
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThresholdOverrideEntry {
    pub service: String,
    pub limit: String,
    #[serde(default)]
    pub warning_percent: Option<u8>,
    #[serde(default)]
    pub critical_percent: Option<u8>,
    #[serde(default)]
    pub warning_count: Option<u64>,
    #[serde(default)]
    pub critical_count: Option<u64>,
}

impl ThresholdOverrideEntry {
    pub fn threshold_override(&self) -> ThresholdOverride {
        ThresholdOverride {
            warning_percent: self.warning_percent,
            critical_percent: self.critical_percent,
            warning_count: self.warning_count,
            critical_count: self.critical_count,
        }
    }
}

impl CheckerConfig {
    /// Check value ranges and duplicates; names are resolved later against the registry
    pub fn validate(&self) -> ConfigResult<()> {
        self.thresholds.validate("global thresholds")?;

        if self.execution.max_concurrent_probes == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.max_concurrent_probes",
                "0",
                "at least one probe must be allowed to run",
            ));
        }
        if self.execution.max_concurrent_probes > execution::MAX_CONCURRENT_PROBES {
            return Err(ConfigurationError::invalid_value(
                "execution.max_concurrent_probes",
                self.execution.max_concurrent_probes.to_string(),
                format!("at most {} probes may run at once", execution::MAX_CONCURRENT_PROBES),
            ));
        }
        if self.execution.probe_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.probe_timeout_ms",
                "0",
                "timeout must be positive",
            ));
        }

        let mut seen_services = HashSet::new();
        for entry in &self.service_thresholds {
            if !seen_services.insert(entry.service.as_str()) {
                return Err(ConfigurationError::duplicate_entry(format!(
                    "service thresholds of {}",
                    entry.service
                )));
            }
            validate_percent_pair(&entry.service, Some(entry.warning), Some(entry.critical))?;
        }

        let mut seen_limits = HashSet::new();
        for entry in &self.limit_overrides {
            if !seen_limits.insert((entry.service.as_str(), entry.limit.as_str())) {
                return Err(ConfigurationError::duplicate_entry(format!(
                    "limit override of {}.{}",
                    entry.service, entry.limit
                )));
            }
        }

        let mut seen_thresholds = HashSet::new();
        for entry in &self.threshold_overrides {
            let scope = format!("{}.{}", entry.service, entry.limit);
            if !seen_thresholds.insert((entry.service.as_str(), entry.limit.as_str())) {
                return Err(ConfigurationError::duplicate_entry(format!(
                    "threshold override of {scope}"
                )));
            }
            entry.threshold_override().validate(&scope)?;
        }

        Ok(())
    }

    /// Thresholds a service's limits inherit at construction
    pub fn thresholds_for(&self, service: &str) -> ThresholdConfig {
        self.service_thresholds
            .iter()
            .find(|entry| entry.service == service)
            .map(|entry| ThresholdConfig {
                warning: entry.warning,
                critical: entry.critical,
            })
            .unwrap_or(self.thresholds)
    }

    /// Layer overrides on top of the loaded ones; a later entry for the same limit wins
    pub fn merge_limit_overrides<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = LimitOverrideEntry>,
    {
        for entry in entries {
            self.limit_overrides.retain(|existing| {
                existing.service != entry.service || existing.limit != entry.limit
            });
            self.limit_overrides.push(entry);
        }
    }
}

/// Enforce `0 < warning <= critical <= 100` on whichever values are present
pub fn validate_percent_pair(
    scope: &str,
    warning: Option<u8>,
    critical: Option<u8>,
) -> ConfigResult<()> {
    for (label, value) in [("warning", warning), ("critical", critical)] {
        if let Some(value) = value {
            if value == 0 || value > thresholds::MAX_PERCENT {
                return Err(ConfigurationError::invalid_threshold(
                    scope,
                    format!("{label} percentage {value} must be within 1..=100"),
                ));
            }
        }
    }
    if let (Some(warning), Some(critical)) = (warning, critical) {
        if warning > critical {
            return Err(ConfigurationError::invalid_threshold(
                scope,
                format!("warning {warning}% exceeds critical {critical}%"),
            ));
        }
    }
    Ok(())
}

/// Enforce `warning_count <= critical_count` when both are present
pub fn validate_count_pair(
    scope: &str,
    warning: Option<u64>,
    critical: Option<u64>,
) -> ConfigResult<()> {
    if let (Some(warning), Some(critical)) = (warning, critical) {
        if warning > critical {
            return Err(ConfigurationError::invalid_threshold(
                scope,
                format!("warning count {warning} exceeds critical count {critical}"),
            ));
        }
    }
    Ok(())
}
