//! # Paginator
//!
//! Drains a paginated operation into fully materialised, typed records. Probes that
//! cross-reference two collections collect the lookup side completely before touching
//! the dependent side, since page boundaries of independent streams never line up.

use super::DataSource;
use crate::error::{CheckerResult, FetchFailureKind, LimitCheckerError};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct Paginator<'a> {
    source: &'a dyn DataSource,
    operation: &'a str,
    cancel: &'a CancellationToken,
}

impl<'a> Paginator<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        operation: &'a str,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            source,
            operation,
            cancel,
        }
    }

    /// Fetch every page and decode every record as `T`
    pub async fn collect_all<T: DeserializeOwned>(&self) -> CheckerResult<Vec<T>> {
        let mut records = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(LimitCheckerError::Cancelled);
            }

            let page = self
                .source
                .fetch_page(self.operation, next_token.as_deref())
                .await?;
            pages += 1;

            for record in page.records {
                let decoded = serde_json::from_value::<T>(record).map_err(|e| {
                    LimitCheckerError::fetch(
                        self.source.api_name(),
                        self.operation,
                        FetchFailureKind::MalformedResponse,
                        e,
                    )
                })?;
                records.push(decoded);
            }

            match page.next_token {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(LimitCheckerError::fetch(
                            self.source.api_name(),
                            self.operation,
                            FetchFailureKind::MalformedResponse,
                            format!("continuation token '{token}' repeated"),
                        ));
                    }
                    next_token = Some(token);
                }
                None => break,
            }
        }

        debug!(
            api_name = self.source.api_name(),
            operation = self.operation,
            pages = pages,
            records = records.len(),
            "Paginated operation drained"
        );

        Ok(records)
    }
}
