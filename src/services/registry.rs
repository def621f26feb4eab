//! # Probe Registry
//!
//! The fixed set of probes, built once per checker with thresholds resolved from
//! configuration and shared with probe tasks through `Arc`.

use super::{AppStreamService, LimitMap, ServiceProbe, WorkspacesService};
use crate::config::{CheckerConfig, ConfigResult, ConfigurationError};
use crate::connection::Connector;
use crate::error::CheckerResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Every service name the registry knows how to probe
pub const KNOWN_SERVICES: [&str; 2] = [
    AppStreamService::SERVICE_NAME,
    WorkspacesService::SERVICE_NAME,
];

/// Closed set of concrete probes
#[derive(Debug)]
pub enum Probe {
    AppStream(AppStreamService),
    Workspaces(WorkspacesService),
}

impl Probe {
    fn inner(&self) -> &dyn ServiceProbe {
        match self {
            Probe::AppStream(probe) => probe,
            Probe::Workspaces(probe) => probe,
        }
    }
}

#[async_trait]
impl ServiceProbe for Probe {
    fn service_name(&self) -> &'static str {
        self.inner().service_name()
    }

    fn api_name(&self) -> &'static str {
        self.inner().api_name()
    }

    fn get_limits(&self) -> &LimitMap {
        self.inner().get_limits()
    }

    async fn find_usage(&self, cancel: &CancellationToken) -> CheckerResult<()> {
        match self {
            Probe::AppStream(probe) => probe.find_usage(cancel).await,
            Probe::Workspaces(probe) => probe.find_usage(cancel).await,
        }
    }

    fn required_iam_permissions(&self) -> &'static [&'static str] {
        self.inner().required_iam_permissions()
    }

    fn have_usage(&self) -> bool {
        self.inner().have_usage()
    }

    fn discard_usage(&self) {
        self.inner().discard_usage();
    }
}

#[derive(Debug)]
pub struct ProbeRegistry {
    probes: BTreeMap<&'static str, Arc<Probe>>,
}

impl ProbeRegistry {
    /// Build every known probe; fails if configuration names a service that does not exist
    pub fn new(config: &CheckerConfig, connector: Arc<dyn Connector>) -> ConfigResult<Self> {
        for entry in &config.service_thresholds {
            if !KNOWN_SERVICES.contains(&entry.service.as_str()) {
                return Err(ConfigurationError::unknown_service(entry.service.as_str()));
            }
        }

        let probes = [
            Probe::AppStream(AppStreamService::new(
                config.thresholds_for(AppStreamService::SERVICE_NAME),
                connector.clone(),
            )),
            Probe::Workspaces(WorkspacesService::new(
                config.thresholds_for(WorkspacesService::SERVICE_NAME),
                connector,
            )),
        ];

        let probes: BTreeMap<_, _> = probes
            .into_iter()
            .map(|probe| (probe.service_name(), Arc::new(probe)))
            .collect();

        debug!(services = ?probes.keys().collect::<Vec<_>>(), "Probe registry constructed");
        Ok(Self { probes })
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.probes.keys().copied().collect()
    }

    pub fn get(&self, service: &str) -> Option<&Arc<Probe>> {
        self.probes.get(service)
    }

    /// Resolve a service name or fail with a configuration error
    pub fn require(&self, service: &str) -> ConfigResult<&Arc<Probe>> {
        self.get(service)
            .ok_or_else(|| ConfigurationError::unknown_service(service))
    }

    /// Probes named by `filter`, or all of them in name order
    pub fn select(&self, filter: Option<&[String]>) -> ConfigResult<Vec<Arc<Probe>>> {
        match filter {
            None => Ok(self.probes.values().cloned().collect()),
            Some(names) => {
                let mut selected = BTreeMap::new();
                for name in names {
                    let probe = self.require(name)?;
                    selected.insert(probe.service_name(), probe.clone());
                }
                Ok(selected.into_values().collect())
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Probe>> {
        self.probes.values()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceThresholdEntry;
    use crate::connection::{Snapshot, SnapshotConnector};

    fn connector() -> Arc<dyn Connector> {
        Arc::new(SnapshotConnector::new(Snapshot::default()))
    }

    #[test]
    fn test_registry_contains_known_services() {
        let registry = ProbeRegistry::new(&CheckerConfig::default(), connector()).unwrap();
        assert_eq!(registry.service_names(), vec!["AppStream", "WorkSpaces"]);
        assert_eq!(registry.len(), KNOWN_SERVICES.len());
        assert!(registry.get("WorkSpaces").is_some());
        assert!(registry.get("EC2").is_none());
    }

    #[test]
    fn test_select_filters_and_dedups() {
        let registry = ProbeRegistry::new(&CheckerConfig::default(), connector()).unwrap();
        let selected = registry
            .select(Some(&["WorkSpaces".to_string(), "WorkSpaces".to_string()]))
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert!(matches!(
            registry.select(Some(&["EC2".to_string()])),
            Err(ConfigurationError::UnknownService { .. })
        ));
    }

    #[test]
    fn test_service_thresholds_reach_limits() {
        let config = CheckerConfig {
            service_thresholds: vec![ServiceThresholdEntry {
                service: "AppStream".to_string(),
                warning: 60,
                critical: 70,
            }],
            ..Default::default()
        };
        let registry = ProbeRegistry::new(&config, connector()).unwrap();
        let stacks = &registry.get("AppStream").unwrap().get_limits()["Stacks"];
        assert_eq!(stacks.def_warning_threshold(), 60);
        let images = &registry.get("WorkSpaces").unwrap().get_limits()["Images"];
        assert_eq!(images.def_warning_threshold(), 80);
    }

    #[test]
    fn test_unknown_service_threshold_rejected() {
        let config = CheckerConfig {
            service_thresholds: vec![ServiceThresholdEntry {
                service: "EC2".to_string(),
                warning: 60,
                critical: 70,
            }],
            ..Default::default()
        };
        assert!(matches!(
            ProbeRegistry::new(&config, connector()),
            Err(ConfigurationError::UnknownService { .. })
        ));
    }

    #[test]
    fn test_get_limits_identity_through_enum() {
        let registry = ProbeRegistry::new(&CheckerConfig::default(), connector()).unwrap();
        let probe = registry.get("AppStream").unwrap();
        assert!(std::ptr::eq(probe.get_limits(), probe.get_limits()));
    }
}
