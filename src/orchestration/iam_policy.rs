//! IAM policy document covering every API action the probes call.

use crate::constants::IAM_POLICY_VERSION;
use crate::error::{CheckerResult, LimitCheckerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamPolicy {
    pub version: String,
    pub statement: Vec<IamStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamStatement {
    pub effect: String,
    pub resource: String,
    pub action: Vec<String>,
}

impl IamPolicy {
    /// Single allow statement over `actions`, sorted and deduplicated
    pub fn from_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let action: BTreeSet<String> = actions.into_iter().map(Into::into).collect();
        Self {
            version: IAM_POLICY_VERSION.to_string(),
            statement: vec![IamStatement {
                effect: "Allow".to_string(),
                resource: "*".to_string(),
                action: action.into_iter().collect(),
            }],
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .flat_map(|statement| statement.action.iter().map(String::as_str))
    }

    pub fn to_json_pretty(&self) -> CheckerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LimitCheckerError::Internal(format!("failed to render IAM policy: {e}")))
    }
}
