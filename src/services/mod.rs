//! # Service Probes
//!
//! A probe owns the limits of one provider service, knows how to fetch that service's
//! raw inventory and turns each fetched record into usage observations.
//!
//! ## Pass lifecycle
//!
//! ```text
//! find_usage()
//! ├── have_usage = false
//! ├── connect (once per probe, reused afterwards)
//! ├── reset usage of every owned limit
//! ├── fetch + classify records  ──error──> reset again, surface error
//! └── have_usage = true
//! ```
//!
//! The set of probes is closed: [`Probe`] enumerates every concrete service and the
//! [`ProbeRegistry`] maps service names to shared probe instances.

pub mod appstream;
pub mod registry;
pub mod workspaces;

use crate::config::ThresholdConfig;
use crate::connection::{Connector, DataSource};
use crate::error::{CheckerResult, LimitCheckerError};
use crate::models::{Limit, LimitSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use appstream::AppStreamService;
pub use registry::{Probe, ProbeRegistry};
pub use workspaces::WorkspacesService;

/// Limits of one service keyed by limit name
pub type LimitMap = BTreeMap<String, Limit>;

/// Capability shared by every service probe
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Human-facing service name, unique across the registry
    fn service_name(&self) -> &'static str;

    /// Identifier used to open the data-source connection
    fn api_name(&self) -> &'static str;

    /// Every limit this service declares; built on first call and cached
    fn get_limits(&self) -> &LimitMap;

    /// Reset and repopulate usage for every owned limit
    async fn find_usage(&self, cancel: &CancellationToken) -> CheckerResult<()>;

    /// IAM actions the fetch operations need
    fn required_iam_permissions(&self) -> &'static [&'static str];

    /// Whether the most recent pass completed without error
    fn have_usage(&self) -> bool;

    /// Throw away usage from an abandoned pass
    fn discard_usage(&self);
}

/// State and pass mechanics shared by concrete probes
pub struct ServiceBase {
    service_name: &'static str,
    api_name: &'static str,
    thresholds: ThresholdConfig,
    default_limits: &'static [LimitSpec],
    limits: OnceLock<LimitMap>,
    have_usage: AtomicBool,
    connector: Arc<dyn Connector>,
    conn: tokio::sync::OnceCell<Arc<dyn DataSource>>,
    pass_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ServiceBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBase")
            .field("service_name", &self.service_name)
            .field("api_name", &self.api_name)
            .field("thresholds", &self.thresholds)
            .field("have_usage", &self.have_usage())
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

impl ServiceBase {
    pub fn new(
        service_name: &'static str,
        api_name: &'static str,
        default_limits: &'static [LimitSpec],
        thresholds: ThresholdConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            service_name,
            api_name,
            thresholds,
            default_limits,
            limits: OnceLock::new(),
            have_usage: AtomicBool::new(false),
            connector,
            conn: tokio::sync::OnceCell::new(),
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn api_name(&self) -> &'static str {
        self.api_name
    }

    pub fn warning_threshold(&self) -> u8 {
        self.thresholds.warning
    }

    pub fn critical_threshold(&self) -> u8 {
        self.thresholds.critical
    }

    /// Build the limit map from the static default table exactly once
    pub fn limits(&self) -> &LimitMap {
        self.limits.get_or_init(|| {
            debug!(
                service = self.service_name,
                limits = self.default_limits.len(),
                "Constructing default limits"
            );
            self.default_limits
                .iter()
                .map(|spec| {
                    (
                        spec.name.to_string(),
                        Limit::from_spec(
                            spec,
                            self.service_name,
                            self.thresholds.warning,
                            self.thresholds.critical,
                        ),
                    )
                })
                .collect()
        })
    }

    /// Look up an owned limit; a miss means the probe and its default table disagree
    pub fn limit(&self, name: &str) -> CheckerResult<&Limit> {
        self.limits().get(name).ok_or_else(|| {
            LimitCheckerError::Internal(format!(
                "{} probe references undeclared limit '{name}'",
                self.service_name
            ))
        })
    }

    pub fn have_usage(&self) -> bool {
        self.have_usage.load(Ordering::Acquire)
    }

    pub fn reset_all_usage(&self) {
        for limit in self.limits().values() {
            limit.reset_usage();
        }
    }

    pub fn discard_usage(&self) {
        self.have_usage.store(false, Ordering::Release);
        self.reset_all_usage();
    }

    /// Establish the data-source connection, or reuse the one already open
    pub async fn connect(&self) -> CheckerResult<Arc<dyn DataSource>> {
        self.conn
            .get_or_try_init(|| async {
                debug!(service = self.service_name, api_name = self.api_name, "Connecting");
                self.connector.connect(self.api_name).await
            })
            .await
            .cloned()
    }

    /// Run one usage-collection pass with `collect` doing the probe-specific fetching
    pub async fn run_pass<F, Fut>(&self, collect: F) -> CheckerResult<()>
    where
        F: FnOnce(Arc<dyn DataSource>) -> Fut,
        Fut: Future<Output = CheckerResult<()>>,
    {
        let _pass = self.pass_lock.lock().await;
        self.have_usage.store(false, Ordering::Release);
        debug!(service = self.service_name, "Checking usage");

        let conn = self.connect().await?;
        self.reset_all_usage();

        match collect(conn).await {
            Ok(()) => {
                self.have_usage.store(true, Ordering::Release);
                debug!(service = self.service_name, "Done checking usage");
                Ok(())
            }
            Err(e) => {
                warn!(
                    service = self.service_name,
                    error = %e,
                    "Usage collection failed, discarding partial usage"
                );
                self.reset_all_usage();
                Err(e)
            }
        }
    }
}
