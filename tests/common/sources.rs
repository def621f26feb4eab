//! Fake connectors that inject failures, delays and panics per API.

use async_trait::async_trait;
use limit_checker::connection::{Connector, DataSource, Page, Snapshot, SnapshotConnector};
use limit_checker::{CheckerResult, FetchFailureKind, LimitCheckerError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a scripted API misbehaves
#[derive(Debug, Clone)]
pub enum Behavior {
    RefuseConnection,
    FailOperation {
        operation: &'static str,
        kind: FetchFailureKind,
    },
    Delay(Duration),
    Panic,
}

/// Snapshot-backed connector with per-API scripted behavior
pub struct ScriptedConnector {
    inner: SnapshotConnector,
    behaviors: HashMap<String, Behavior>,
    connects: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: SnapshotConnector::new(snapshot),
            behaviors: HashMap::new(),
            connects: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_behavior(mut self, api_name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(api_name.to_string(), behavior);
        self
    }

    pub fn connect_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }

    /// Highest number of `fetch_page` calls seen running at the same time
    pub fn peak_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, api_name: &str) -> CheckerResult<Arc<dyn DataSource>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.get(api_name).cloned();
        if matches!(behavior, Some(Behavior::RefuseConnection)) {
            return Err(LimitCheckerError::connection(api_name, "connection refused"));
        }
        let inner = self.inner.connect(api_name).await?;
        Ok(Arc::new(ScriptedSource {
            inner,
            behavior,
            fetches: Arc::clone(&self.fetches),
            in_flight: Arc::clone(&self.in_flight),
            peak: Arc::clone(&self.peak),
        }))
    }
}

struct ScriptedSource {
    inner: Arc<dyn DataSource>,
    behavior: Option<Behavior>,
    fetches: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Counts a fetch as in flight until dropped
struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn api_name(&self) -> &str {
        self.inner.api_name()
    }

    async fn fetch_page(&self, operation: &str, next_token: Option<&str>) -> CheckerResult<Page> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak);
        match &self.behavior {
            Some(Behavior::FailOperation {
                operation: failing,
                kind,
            }) if *failing == operation => {
                return Err(LimitCheckerError::fetch(
                    self.api_name(),
                    operation,
                    *kind,
                    "scripted failure",
                ));
            }
            Some(Behavior::Delay(delay)) => tokio::time::sleep(*delay).await,
            Some(Behavior::Panic) => panic!("scripted panic in {operation}"),
            _ => {}
        }
        self.inner.fetch_page(operation, next_token).await
    }
}
