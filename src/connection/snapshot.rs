//! # Snapshot Data Source
//!
//! Serves recorded provider responses from a JSON document shaped as
//! `{ "<api_name>": { "<Operation>": [ record, ... ] } }`. Records are handed out in
//! fixed-size pages with offset continuation tokens, so probes exercise the same
//! pagination path they use against a live API.
//!
//! An API missing from the snapshot fails to connect; an operation missing under a
//! present API reads as an empty collection.

use super::{Connector, DataSource, Page};
use crate::constants::execution::DEFAULT_SNAPSHOT_PAGE_SIZE;
use crate::error::{CheckerResult, FetchFailureKind, LimitCheckerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

type OperationRecords = HashMap<String, Vec<serde_json::Value>>;

/// Recorded responses keyed by API name, then operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    apis: HashMap<String, OperationRecords>,
}

impl Snapshot {
    pub fn from_json_str(contents: &str) -> CheckerResult<Self> {
        serde_json::from_str(contents).map_err(|e| {
            LimitCheckerError::connection("snapshot", format!("invalid snapshot: {e}"))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CheckerResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LimitCheckerError::connection("snapshot", format!("{}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Add or replace the records of one operation
    pub fn insert<A: Into<String>, O: Into<String>>(
        &mut self,
        api_name: A,
        operation: O,
        records: Vec<serde_json::Value>,
    ) {
        self.apis
            .entry(api_name.into())
            .or_default()
            .insert(operation.into(), records);
    }

    pub fn api_names(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotConnector {
    snapshot: Arc<Snapshot>,
    page_size: usize,
}

impl SnapshotConnector {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            page_size: DEFAULT_SNAPSHOT_PAGE_SIZE,
        }
    }

    /// Serve `page_size` records per page (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl Connector for SnapshotConnector {
    async fn connect(&self, api_name: &str) -> CheckerResult<Arc<dyn DataSource>> {
        let operations = self.snapshot.apis.get(api_name).ok_or_else(|| {
            LimitCheckerError::connection(api_name, "no recorded responses for this API")
        })?;
        debug!(api_name = api_name, operations = operations.len(), "Snapshot connection opened");
        Ok(Arc::new(SnapshotDataSource {
            api_name: api_name.to_string(),
            operations: operations.clone(),
            page_size: self.page_size,
        }))
    }
}

struct SnapshotDataSource {
    api_name: String,
    operations: OperationRecords,
    page_size: usize,
}

#[async_trait]
impl DataSource for SnapshotDataSource {
    fn api_name(&self) -> &str {
        &self.api_name
    }

    async fn fetch_page(&self, operation: &str, next_token: Option<&str>) -> CheckerResult<Page> {
        let records: &[serde_json::Value] = self
            .operations
            .get(operation)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let offset = match next_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|e| {
                LimitCheckerError::fetch(
                    &self.api_name,
                    operation,
                    FetchFailureKind::MalformedResponse,
                    format!("bad continuation token '{token}': {e}"),
                )
            })?,
        };

        let start = offset.min(records.len());
        let end = (start + self.page_size).min(records.len());
        let next_token = (end < records.len()).then(|| end.to_string());

        Ok(Page {
            records: records[start..end].to_vec(),
            next_token,
        })
    }
}
