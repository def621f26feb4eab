//! # Limit Checker
//!
//! Entry point for a check pass. Owns the probe registry, applies overrides, runs
//! usage collection for the selected probes on bounded concurrent tasks and folds
//! their outcomes into a [`CheckReport`].
//!
//! ## Pass flow
//!
//! ```text
//! check_thresholds(filter, cancel)
//! ├── select probes (unknown name -> configuration error, nothing runs)
//! ├── spawn one task per probe, gated by a semaphore
//! │   └── find_usage under timeout, racing the cancellation token
//! ├── join every task (barrier)
//! │   ├── failure / timeout / panic -> discard that probe's usage, record error
//! │   └── cancellation              -> discard all usage, return Cancelled
//! └── evaluate each successful probe's limits
//! ```
//!
//! Overrides take `&mut self`, so they can never interleave with a pass in flight.

use super::iam_policy::IamPolicy;
use super::threshold_evaluator::evaluate_limit;
use super::types::{CheckReport, ServiceFailure, ServiceLimitReports};
use crate::config::{
    CheckerConfig, ConfigResult, ConfigurationError, ExecutionConfig, LimitOverrideEntry,
};
use crate::connection::Connector;
use crate::error::{CheckerResult, LimitCheckerError};
use crate::logging::{log_error, log_probe_operation};
use crate::models::{Limit, ThresholdOverride};
use crate::services::{LimitMap, Probe, ProbeRegistry, ServiceProbe};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outcome of one probe's usage collection
pub type ProbeOutcome = Result<(), ServiceFailure>;

#[derive(Debug)]
pub struct LimitChecker {
    execution: ExecutionConfig,
    registry: ProbeRegistry,
}

impl LimitChecker {
    /// Build the registry and apply every configured override; any unknown name fails
    /// construction
    pub fn new(config: &CheckerConfig, connector: Arc<dyn Connector>) -> ConfigResult<Self> {
        config.validate()?;
        let registry = ProbeRegistry::new(config, connector)?;
        let mut checker = Self {
            execution: config.execution.clone(),
            registry,
        };

        checker.set_limit_overrides(&config.limit_overrides)?;
        for entry in &config.threshold_overrides {
            checker.set_threshold_override(
                &entry.service,
                &entry.limit,
                entry.threshold_override(),
            )?;
        }

        info!(
            services = checker.registry.len(),
            limit_overrides = config.limit_overrides.len(),
            threshold_overrides = config.threshold_overrides.len(),
            max_concurrent_probes = checker.execution.max_concurrent_probes,
            "✅ CHECKER: Initialized"
        );
        Ok(checker)
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.registry.service_names()
    }

    /// Limits of the selected services, keyed by service name
    pub fn get_limits(
        &self,
        filter: Option<&[String]>,
    ) -> ConfigResult<BTreeMap<&'static str, &LimitMap>> {
        let selected = self.registry.select(filter)?;
        Ok(selected
            .iter()
            .filter_map(|probe| {
                let name = probe.service_name();
                self.registry
                    .get(name)
                    .map(|registered| (name, registered.get_limits()))
            })
            .collect())
    }

    fn resolve_limit(&self, service: &str, limit: &str) -> ConfigResult<&Limit> {
        self.registry
            .require(service)?
            .get_limits()
            .get(limit)
            .ok_or_else(|| ConfigurationError::unknown_limit(service, limit))
    }

    /// Replace the ceiling of one limit
    pub fn set_limit_override(
        &mut self,
        service: &str,
        limit: &str,
        value: u64,
        override_ta: bool,
    ) -> ConfigResult<()> {
        let target = self.resolve_limit(service, limit)?;
        target.set_limit_override(value, override_ta);
        debug!(service, limit, value, override_ta, "Limit override applied");
        Ok(())
    }

    /// Apply a batch of ceiling overrides; every name is resolved before any is applied
    pub fn set_limit_overrides(&mut self, entries: &[LimitOverrideEntry]) -> ConfigResult<()> {
        let resolved = entries
            .iter()
            .map(|entry| {
                self.resolve_limit(&entry.service, &entry.limit)
                    .map(|limit| (limit, entry))
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        for (limit, entry) in resolved {
            limit.set_limit_override(entry.value, entry.override_ta);
        }
        if !entries.is_empty() {
            debug!(count = entries.len(), "Limit overrides applied");
        }
        Ok(())
    }

    /// Replace the thresholds of one limit
    pub fn set_threshold_override(
        &mut self,
        service: &str,
        limit: &str,
        threshold_override: ThresholdOverride,
    ) -> ConfigResult<()> {
        self.resolve_limit(service, limit)?
            .set_threshold_override(threshold_override)?;
        debug!(service, limit, ?threshold_override, "Threshold override applied");
        Ok(())
    }

    /// Run usage collection only, without evaluating thresholds
    #[instrument(skip(self, cancel))]
    pub async fn find_usage(
        &self,
        filter: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> CheckerResult<BTreeMap<&'static str, ProbeOutcome>> {
        let probes = self.registry.select(filter)?;
        let outcomes = self.collect_usage(&probes, cancel).await?;
        Ok(probes
            .iter()
            .map(|probe| probe.service_name())
            .zip(outcomes)
            .collect())
    }

    /// Collect usage for the selected services and classify every limit
    #[instrument(skip(self, cancel))]
    pub async fn check_thresholds(
        &self,
        filter: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> CheckerResult<CheckReport> {
        let probes = self.registry.select(filter)?;
        let mut report = CheckReport::new();

        info!(
            check_id = %report.check_id,
            services = probes.len(),
            "🔍 CHECK: Starting limit check pass"
        );

        let outcomes = self.collect_usage(&probes, cancel).await?;

        for (probe, outcome) in probes.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.record_service(probe.service_name(), evaluate_probe(probe))?,
                Err(failure) => report.record_error(probe.service_name(), failure)?,
            }
        }
        report.finish();

        info!(
            check_id = %report.check_id,
            status = ?report.status(),
            warnings = report.warnings().len(),
            criticals = report.criticals().len(),
            unevaluable = report.unevaluable().len(),
            failed_services = report.errors().len(),
            "✅ CHECK: Limit check pass completed"
        );
        Ok(report)
    }

    /// Policy document for every probe in the registry
    pub fn get_required_iam_policy(&self) -> IamPolicy {
        IamPolicy::from_actions(
            self.registry
                .iter()
                .flat_map(|probe| probe.required_iam_permissions().iter().copied()),
        )
    }

    /// Run `find_usage` for each probe on its own task and wait for all of them
    async fn collect_usage(
        &self,
        probes: &[Arc<Probe>],
        cancel: &CancellationToken,
    ) -> CheckerResult<Vec<ProbeOutcome>> {
        if cancel.is_cancelled() {
            return Err(LimitCheckerError::Cancelled);
        }

        let semaphore = Arc::new(Semaphore::new(self.execution.max_concurrent_probes));
        let timeout = self.execution.probe_timeout();
        // Spawned probes stop if this pass is dropped before the barrier
        let pass_cancel = cancel.child_token();
        let _stop_on_drop = pass_cancel.clone().drop_guard();

        let handles: Vec<_> = probes
            .iter()
            .map(|probe| {
                let probe = Arc::clone(probe);
                let semaphore = Arc::clone(&semaphore);
                let cancel = pass_cancel.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        LimitCheckerError::Internal(format!("probe semaphore closed: {e}"))
                    })?;
                    run_probe(&probe, timeout, &cancel).await
                })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(joined.len());
        for (probe, result) in probes.iter().zip(joined) {
            let outcome = match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    probe.discard_usage();
                    Err(ServiceFailure::from(&e))
                }
                Err(join_error) => {
                    probe.discard_usage();
                    log_error(
                        probe.service_name(),
                        "find_usage",
                        &join_error.to_string(),
                        Some("probe task panicked"),
                    );
                    Err(ServiceFailure::panicked(format!(
                        "probe task panicked: {join_error}"
                    )))
                }
            };
            outcomes.push(outcome);
        }

        if cancel.is_cancelled() {
            for probe in probes {
                probe.discard_usage();
            }
            warn!(services = probes.len(), "🛑 CHECK: Pass cancelled, usage discarded");
            return Err(LimitCheckerError::Cancelled);
        }

        Ok(outcomes)
    }
}

async fn run_probe(
    probe: &Probe,
    timeout: Duration,
    cancel: &CancellationToken,
) -> CheckerResult<()> {
    let service = probe.service_name();
    let started = Instant::now();
    log_probe_operation("find_usage", service, "started", None, None);

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LimitCheckerError::Cancelled),
        outcome = tokio::time::timeout(timeout, probe.find_usage(cancel)) => {
            outcome.unwrap_or_else(|_| {
                Err(LimitCheckerError::Timeout {
                    service: service.to_string(),
                    timeout,
                })
            })
        }
    };

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &result {
        Ok(()) => log_probe_operation("find_usage", service, "completed", Some(duration_ms), None),
        Err(LimitCheckerError::Cancelled) => {
            log_probe_operation("find_usage", service, "cancelled", Some(duration_ms), None)
        }
        Err(e) => log_error(service, "find_usage", &e.to_string(), None),
    }
    result
}

fn evaluate_probe(probe: &Probe) -> ServiceLimitReports {
    probe
        .get_limits()
        .iter()
        .map(|(name, limit)| (name.clone(), evaluate_limit(limit)))
        .collect()
}
