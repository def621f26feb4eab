//! # Limit
//!
//! A named, typed ceiling owned by one service, together with the usage observations
//! recorded against it during the current check pass.
//!
//! Configuration (override, API-reported ceiling, threshold override) and usage live
//! behind locks so a probe shared across tasks can record usage through `&self`.

use super::usage::UsageObservation;
use crate::config::{validate_count_pair, validate_percent_pair, ConfigResult, ConfigurationError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// How recorded observations turn into a measured usage value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitClass {
    /// Each observation is one resource; usage is the number of observations
    Count,
    /// Each observation carries an absolute quantity; usage is the largest one
    InstanceValue,
}

/// Where the effective ceiling came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitSource {
    Default,
    Api,
    Override,
}

/// Static description of a limit, as found in a probe's default table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSpec {
    pub name: &'static str,
    pub default_limit: Option<u64>,
    pub limit_type: &'static str,
    pub class: LimitClass,
}

impl LimitSpec {
    pub const fn count(name: &'static str, default_limit: u64, limit_type: &'static str) -> Self {
        Self {
            name,
            default_limit: Some(default_limit),
            limit_type,
            class: LimitClass::Count,
        }
    }

    pub const fn instance_value(
        name: &'static str,
        default_limit: u64,
        limit_type: &'static str,
    ) -> Self {
        Self {
            name,
            default_limit: Some(default_limit),
            limit_type,
            class: LimitClass::InstanceValue,
        }
    }

    /// A limit with no published default ceiling
    pub const fn without_default(mut self) -> Self {
        self.default_limit = None;
        self
    }
}

/// Per-limit replacement for the inherited warning/critical thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    pub warning_percent: Option<u8>,
    pub critical_percent: Option<u8>,
    /// Absolute usage at or above which the limit is a warning
    pub warning_count: Option<u64>,
    /// Absolute usage at or above which the limit is critical
    pub critical_count: Option<u64>,
}

impl ThresholdOverride {
    pub fn validate(&self, scope: &str) -> ConfigResult<()> {
        if *self == Self::default() {
            return Err(ConfigurationError::invalid_threshold(
                scope,
                "override sets no threshold",
            ));
        }
        validate_percent_pair(scope, self.warning_percent, self.critical_percent)?;
        validate_count_pair(scope, self.warning_count, self.critical_count)
    }
}

/// Thresholds in force for a limit once overrides are merged with inherited defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveThresholds {
    pub warning_percent: u8,
    pub critical_percent: u8,
    pub warning_count: Option<u64>,
    pub critical_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LimitOverride {
    value: u64,
    override_ta: bool,
}

#[derive(Debug)]
pub struct Limit {
    name: String,
    service_name: String,
    default_limit: Option<u64>,
    def_warning_threshold: u8,
    def_critical_threshold: u8,
    limit_type: String,
    class: LimitClass,
    limit_override: RwLock<Option<LimitOverride>>,
    api_limit: RwLock<Option<u64>>,
    threshold_override: RwLock<Option<ThresholdOverride>>,
    usage: Mutex<Vec<UsageObservation>>,
}

impl Limit {
    /// Build a limit from its static spec, inheriting the owning service's thresholds
    pub fn from_spec(
        spec: &LimitSpec,
        service_name: &str,
        warning_threshold: u8,
        critical_threshold: u8,
    ) -> Self {
        Self {
            name: spec.name.to_string(),
            service_name: service_name.to_string(),
            default_limit: spec.default_limit,
            def_warning_threshold: warning_threshold,
            def_critical_threshold: critical_threshold,
            limit_type: spec.limit_type.to_string(),
            class: spec.class,
            limit_override: RwLock::new(None),
            api_limit: RwLock::new(None),
            threshold_override: RwLock::new(None),
            usage: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn default_limit(&self) -> Option<u64> {
        self.default_limit
    }

    pub fn limit_type(&self) -> &str {
        &self.limit_type
    }

    pub fn class(&self) -> LimitClass {
        self.class
    }

    pub fn def_warning_threshold(&self) -> u8 {
        self.def_warning_threshold
    }

    pub fn def_critical_threshold(&self) -> u8 {
        self.def_critical_threshold
    }

    /// Append one observation; a probe may call this once per resource
    pub fn add_current_usage(&self, observation: UsageObservation) {
        self.usage.lock().push(observation);
    }

    /// Clear observations, leaving ceilings and thresholds untouched
    pub fn reset_usage(&self) {
        self.usage.lock().clear();
    }

    /// Snapshot of the observations recorded so far
    pub fn get_current_usage(&self) -> Vec<UsageObservation> {
        self.usage.lock().clone()
    }

    pub fn usage_count(&self) -> usize {
        self.usage.lock().len()
    }

    /// Largest single observation, if any were recorded
    pub fn max_usage(&self) -> Option<f64> {
        self.usage
            .lock()
            .iter()
            .map(UsageObservation::value)
            .fold(None, |max, v| match max {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Usage compared against the ceiling: observation count, or the largest value
    pub fn measured_usage(&self) -> f64 {
        match self.class {
            LimitClass::Count => self.usage_count() as f64,
            LimitClass::InstanceValue => self.max_usage().unwrap_or(0.0),
        }
    }

    /// Replace the ceiling for all future evaluations; a later call replaces an earlier one
    pub fn set_limit_override(&self, value: u64, override_ta: bool) {
        *self.limit_override.write() = Some(LimitOverride { value, override_ta });
    }

    /// Record a ceiling reported by the provider API
    pub fn set_api_limit(&self, value: u64) {
        *self.api_limit.write() = Some(value);
    }

    pub fn limit_override(&self) -> Option<u64> {
        self.limit_override.read().map(|o| o.value)
    }

    pub fn api_limit(&self) -> Option<u64> {
        *self.api_limit.read()
    }

    /// Effective ceiling: override, then API-reported ceiling, then default
    pub fn get_limit(&self) -> Option<u64> {
        match self.get_limit_source() {
            LimitSource::Override => self.limit_override(),
            LimitSource::Api => self.api_limit(),
            LimitSource::Default => self.default_limit,
        }
    }

    pub fn get_limit_source(&self) -> LimitSource {
        let api_limit = *self.api_limit.read();
        match *self.limit_override.read() {
            Some(o) if o.override_ta || api_limit.is_none() => LimitSource::Override,
            _ if api_limit.is_some() => LimitSource::Api,
            _ => LimitSource::Default,
        }
    }

    /// Install a threshold override after checking it against the inherited defaults
    pub fn set_threshold_override(
        &self,
        threshold_override: ThresholdOverride,
    ) -> ConfigResult<()> {
        let scope = format!("{}.{}", self.service_name, self.name);
        threshold_override.validate(&scope)?;
        validate_percent_pair(
            &scope,
            Some(
                threshold_override
                    .warning_percent
                    .unwrap_or(self.def_warning_threshold),
            ),
            Some(
                threshold_override
                    .critical_percent
                    .unwrap_or(self.def_critical_threshold),
            ),
        )?;
        *self.threshold_override.write() = Some(threshold_override);
        Ok(())
    }

    pub fn threshold_override(&self) -> Option<ThresholdOverride> {
        *self.threshold_override.read()
    }

    pub fn effective_thresholds(&self) -> EffectiveThresholds {
        let o = self.threshold_override().unwrap_or_default();
        EffectiveThresholds {
            warning_percent: o.warning_percent.unwrap_or(self.def_warning_threshold),
            critical_percent: o.critical_percent.unwrap_or(self.def_critical_threshold),
            warning_count: o.warning_count,
            critical_count: o.critical_count,
        }
    }
}
