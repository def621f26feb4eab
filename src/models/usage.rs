//! # Usage Observation
//!
//! One recorded data point against a limit. Observations are built once and never
//! mutated; the owning limit only appends or clears them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageObservation {
    value: f64,
    resource_id: Option<String>,
    label: Option<String>,
    aws_type: Option<String>,
}

impl UsageObservation {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            resource_id: None,
            label: None,
            aws_type: None,
        }
    }

    /// Identifier of the resource this value was measured on
    pub fn with_resource_id<S: Into<String>>(mut self, resource_id: S) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Resource type tag, e.g. `AWS::WorkSpaces::Workspace`
    pub fn with_aws_type<S: Into<String>>(mut self, aws_type: S) -> Self {
        self.aws_type = Some(aws_type.into());
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn aws_type(&self) -> Option<&str> {
        self.aws_type.as_deref()
    }
}

impl fmt::Display for UsageObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "{id}={}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}
