//! # Data Source Connections
//!
//! The narrow read-only interface probes use to reach the provider. A [`Connector`]
//! opens one [`DataSource`] per API name; a data source serves paginated
//! describe/list operations as pages of JSON records that probes decode into their own
//! typed structs.
//!
//! Provider SDK adapters implement these traits outside the core. The crate ships
//! [`SnapshotConnector`] for offline checks against recorded responses.

pub mod paginator;
pub mod snapshot;

use crate::error::CheckerResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use paginator::Paginator;
pub use snapshot::{Snapshot, SnapshotConnector};

/// One page returned by a paginated operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<serde_json::Value>,
    /// Continuation token; `None` on the last page
    pub next_token: Option<String>,
}

/// An established connection to one provider API
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The API this connection was opened for
    fn api_name(&self) -> &str;

    /// Fetch one page of `operation`, starting after `next_token`
    async fn fetch_page(&self, operation: &str, next_token: Option<&str>) -> CheckerResult<Page>;
}

/// Opens data-source connections by API name
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, api_name: &str) -> CheckerResult<Arc<dyn DataSource>>;
}
