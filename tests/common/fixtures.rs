//! Recorded provider responses shared by the integration tests.

use limit_checker::connection::Snapshot;
use limit_checker::CheckerConfig;
use serde_json::json;

/// `n` AppStream stacks named `stack-0..n`
pub fn stacks(n: usize) -> Vec<serde_json::Value> {
    (0..n).map(|i| json!({ "Name": format!("stack-{i}") })).collect()
}

/// Fleets with the given desired capacities
pub fn fleets(desired: &[u64]) -> Vec<serde_json::Value> {
    desired
        .iter()
        .enumerate()
        .map(|(i, desired)| {
            json!({
                "Name": format!("fleet-{i}"),
                "ComputeCapacityStatus": { "Desired": desired, "Running": 0 }
            })
        })
        .collect()
}

/// Snapshot with AppStream stacks and fleets plus a small WorkSpaces estate
pub fn account_snapshot(stack_count: usize, fleet_capacities: &[u64]) -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.insert("appstream", "DescribeStacks", stacks(stack_count));
    snapshot.insert("appstream", "DescribeFleets", fleets(fleet_capacities));
    snapshot.insert(
        "workspaces",
        "DescribeWorkspaceBundles",
        vec![
            json!({ "BundleId": "wsb-value", "ComputeType": { "Name": "VALUE" } }),
            json!({ "BundleId": "wsb-gfx", "ComputeType": { "Name": "GRAPHICSPRO" } }),
        ],
    );
    snapshot.insert(
        "workspaces",
        "DescribeWorkspaces",
        vec![
            json!({ "WorkspaceId": "ws-1", "BundleId": "wsb-value", "UserName": "alice" }),
            json!({ "WorkspaceId": "ws-2", "BundleId": "wsb-gfx", "UserName": "bob" }),
        ],
    );
    snapshot
}

/// Default config with the given global thresholds
pub fn config_with_thresholds(warning: u8, critical: u8) -> CheckerConfig {
    let mut config = CheckerConfig::default();
    config.thresholds.warning = warning;
    config.thresholds.critical = critical;
    config
}
