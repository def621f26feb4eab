//! # WorkSpaces Probe
//!
//! Counts bundles, images and workspaces. A workspace's compute type is only known via
//! its bundle, so the complete bundle collection is materialised into a lookup table
//! before any workspace is classified.

use super::{LimitMap, ServiceBase, ServiceProbe};
use crate::config::ThresholdConfig;
use crate::connection::{Connector, DataSource, Paginator};
use crate::error::CheckerResult;
use crate::models::{LimitSpec, UsageObservation};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const AWS_TYPE: &str = "AWS::WorkSpaces::Workspace";

const BUNDLES: &str = "Bundles";
const IMAGES: &str = "Images";
const WORKSPACES: &str = "Workspaces";
const GRAPHICS: &str = "GRAPHICS";

/// Compute types with their own per-type limit in addition to the total
const STANDARD_COMPUTE_TYPES: [&str; 4] = ["VALUE", "STANDARD", "PERFORMANCE", "POWER"];

static DEFAULT_LIMITS: [LimitSpec; 8] = [
    LimitSpec::count("VALUE", 1, AWS_TYPE),
    LimitSpec::count("STANDARD", 1, AWS_TYPE),
    LimitSpec::count("PERFORMANCE", 1, AWS_TYPE),
    LimitSpec::count("POWER", 1, AWS_TYPE),
    LimitSpec::count(WORKSPACES, 1, AWS_TYPE),
    LimitSpec::count(GRAPHICS, 0, AWS_TYPE),
    LimitSpec::count(IMAGES, 15, "AWS::WorkSpaces::Image"),
    LimitSpec::count(BUNDLES, 15, "AWS::WorkSpaces::Bundle"),
];

static IAM_PERMISSIONS: [&str; 3] = [
    "workspaces:DescribeWorkspaceBundles",
    "workspaces:DescribeWorkspaceImages",
    "workspaces:DescribeWorkspaces",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WorkspaceBundle {
    bundle_id: String,
    #[serde(default)]
    compute_type: Option<ComputeType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComputeType {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Workspace {
    workspace_id: String,
    #[serde(default)]
    bundle_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WorkspaceImage {
    image_id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug)]
pub struct WorkspacesService {
    base: ServiceBase,
}

impl WorkspacesService {
    pub const SERVICE_NAME: &'static str = "WorkSpaces";
    pub const API_NAME: &'static str = "workspaces";

    pub fn new(thresholds: ThresholdConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            base: ServiceBase::new(
                Self::SERVICE_NAME,
                Self::API_NAME,
                &DEFAULT_LIMITS,
                thresholds,
                connector,
            ),
        }
    }

    pub fn base(&self) -> &ServiceBase {
        &self.base
    }

    async fn collect_usage(
        &self,
        conn: Arc<dyn DataSource>,
        cancel: &CancellationToken,
    ) -> CheckerResult<()> {
        let bundles: Vec<WorkspaceBundle> =
            Paginator::new(conn.as_ref(), "DescribeWorkspaceBundles", cancel)
                .collect_all()
                .await?;

        let bundles_limit = self.base.limit(BUNDLES)?;
        let mut compute_types = HashMap::with_capacity(bundles.len());
        for bundle in bundles {
            bundles_limit.add_current_usage(
                UsageObservation::new(1.0)
                    .with_resource_id(bundle.bundle_id.as_str())
                    .with_aws_type("AWS::WorkSpaces::Bundle"),
            );
            if let Some(compute_type) = bundle.compute_type {
                compute_types.insert(bundle.bundle_id, compute_type.name);
            }
        }

        let workspaces: Vec<Workspace> =
            Paginator::new(conn.as_ref(), "DescribeWorkspaces", cancel)
                .collect_all()
                .await?;

        for workspace in workspaces {
            let compute_type = workspace
                .bundle_id
                .as_deref()
                .and_then(|bundle_id| compute_types.get(bundle_id));
            let Some(compute_type) = compute_type else {
                debug!(
                    workspace_id = %workspace.workspace_id,
                    bundle_id = ?workspace.bundle_id,
                    "Skipping workspace with unknown bundle"
                );
                continue;
            };

            let observation = || {
                let obs = UsageObservation::new(1.0)
                    .with_resource_id(workspace.workspace_id.as_str())
                    .with_aws_type(AWS_TYPE);
                match &workspace.user_name {
                    Some(user) => obs.with_label(user.as_str()),
                    None => obs,
                }
            };

            for limit_name in classify(compute_type) {
                self.base.limit(limit_name)?.add_current_usage(observation());
            }
        }

        let images: Vec<WorkspaceImage> =
            Paginator::new(conn.as_ref(), "DescribeWorkspaceImages", cancel)
                .collect_all()
                .await?;

        let images_limit = self.base.limit(IMAGES)?;
        for image in images {
            let obs = UsageObservation::new(1.0)
                .with_resource_id(image.image_id.as_str())
                .with_aws_type("AWS::WorkSpaces::Image");
            images_limit.add_current_usage(match image.name {
                Some(name) => obs.with_label(name),
                None => obs,
            });
        }

        Ok(())
    }
}

/// Limits a workspace of the given compute type counts toward
fn classify(compute_type: &str) -> Vec<&'static str> {
    if let Some(standard) = STANDARD_COMPUTE_TYPES
        .iter()
        .copied()
        .find(|candidate| *candidate == compute_type)
    {
        vec![WORKSPACES, standard]
    } else if compute_type.starts_with(GRAPHICS) {
        vec![GRAPHICS]
    } else {
        vec![WORKSPACES]
    }
}

#[async_trait]
impl ServiceProbe for WorkspacesService {
    fn service_name(&self) -> &'static str {
        Self::SERVICE_NAME
    }

    fn api_name(&self) -> &'static str {
        Self::API_NAME
    }

    fn get_limits(&self) -> &LimitMap {
        self.base.limits()
    }

    async fn find_usage(&self, cancel: &CancellationToken) -> CheckerResult<()> {
        self.base
            .run_pass(|conn| self.collect_usage(conn, cancel))
            .await
    }

    fn required_iam_permissions(&self) -> &'static [&'static str] {
        &IAM_PERMISSIONS
    }

    fn have_usage(&self) -> bool {
        self.base.have_usage()
    }

    fn discard_usage(&self) {
        self.base.discard_usage();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Snapshot, SnapshotConnector};
    use crate::error::LimitCheckerError;
    use serde_json::json;

    fn thresholds() -> ThresholdConfig {
        ThresholdConfig {
            warning: 21,
            critical: 43,
        }
    }

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.insert(
            "workspaces",
            "DescribeWorkspaceBundles",
            vec![
                json!({ "BundleId": "wsb-value", "ComputeType": { "Name": "VALUE" } }),
                json!({ "BundleId": "wsb-power", "ComputeType": { "Name": "POWER" } }),
                json!({ "BundleId": "wsb-gfx", "ComputeType": { "Name": "GRAPHICSPRO" } }),
                json!({ "BundleId": "wsb-pro", "ComputeType": { "Name": "POWERPRO" } }),
            ],
        );
        snapshot.insert(
            "workspaces",
            "DescribeWorkspaces",
            vec![
                json!({ "WorkspaceId": "ws-1", "BundleId": "wsb-value", "UserName": "alice" }),
                json!({ "WorkspaceId": "ws-2", "BundleId": "wsb-value" }),
                json!({ "WorkspaceId": "ws-3", "BundleId": "wsb-power" }),
                json!({ "WorkspaceId": "ws-4", "BundleId": "wsb-gfx" }),
                json!({ "WorkspaceId": "ws-5", "BundleId": "wsb-pro" }),
                json!({ "WorkspaceId": "ws-6", "BundleId": "wsb-gone" }),
            ],
        );
        snapshot.insert(
            "workspaces",
            "DescribeWorkspaceImages",
            vec![json!({ "ImageId": "wsi-1", "Name": "golden" })],
        );
        snapshot
    }

    fn service(snapshot: Snapshot) -> WorkspacesService {
        let connector = SnapshotConnector::new(snapshot).with_page_size(2);
        WorkspacesService::new(thresholds(), Arc::new(connector))
    }

    #[test]
    fn test_init() {
        let cls = service(Snapshot::default());
        assert_eq!(cls.service_name(), "WorkSpaces");
        assert_eq!(cls.api_name(), "workspaces");
        assert_eq!(cls.base().warning_threshold(), 21);
        assert_eq!(cls.base().critical_threshold(), 43);
        assert!(!cls.have_usage());
    }

    #[test]
    fn test_get_limits() {
        let cls = service(Snapshot::default());
        let limits = cls.get_limits();
        let names: Vec<_> = limits.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "Bundles",
                "GRAPHICS",
                "Images",
                "PERFORMANCE",
                "POWER",
                "STANDARD",
                "VALUE",
                "Workspaces"
            ]
        );
        for limit in limits.values() {
            assert_eq!(limit.service_name(), "WorkSpaces");
            assert_eq!(limit.def_warning_threshold(), 21);
            assert_eq!(limit.def_critical_threshold(), 43);
        }
        assert_eq!(limits["GRAPHICS"].default_limit(), Some(0));
        assert_eq!(limits["Bundles"].default_limit(), Some(15));
    }

    #[test]
    fn test_get_limits_again() {
        let cls = service(Snapshot::default());
        let first = cls.get_limits() as *const LimitMap;
        cls.get_limits()["Images"].set_limit_override(3, true);
        let second = cls.get_limits() as *const LimitMap;
        assert!(std::ptr::eq(first, second));
        assert_eq!(cls.get_limits()["Images"].get_limit(), Some(3));
    }

    #[tokio::test]
    async fn test_find_usage() {
        let cls = service(snapshot());
        cls.find_usage(&CancellationToken::new()).await.unwrap();
        assert!(cls.have_usage());

        let limits = cls.get_limits();
        assert_eq!(limits["Bundles"].usage_count(), 4);
        // ws-1, ws-2, ws-3 and the POWERPRO workspace ws-5
        assert_eq!(limits["Workspaces"].usage_count(), 4);
        assert_eq!(limits["VALUE"].usage_count(), 2);
        assert_eq!(limits["POWER"].usage_count(), 1);
        assert_eq!(limits["STANDARD"].usage_count(), 0);
        assert_eq!(limits["GRAPHICS"].usage_count(), 1);
        assert_eq!(limits["Images"].usage_count(), 1);

        let value_usage = limits["VALUE"].get_current_usage();
        assert_eq!(value_usage[0].resource_id(), Some("ws-1"));
        assert_eq!(value_usage[0].label(), Some("alice"));
    }

    #[tokio::test]
    async fn test_find_usage_twice_does_not_double_count() {
        let cls = service(snapshot());
        let cancel = CancellationToken::new();
        cls.find_usage(&cancel).await.unwrap();
        cls.find_usage(&cancel).await.unwrap();
        assert_eq!(cls.get_limits()["Bundles"].usage_count(), 4);
        assert_eq!(cls.get_limits()["Workspaces"].usage_count(), 4);
    }

    #[tokio::test]
    async fn test_malformed_record_discards_partial_usage() {
        let mut broken = snapshot();
        broken.insert(
            "workspaces",
            "DescribeWorkspaceImages",
            vec![json!({ "NoImageId": true })],
        );
        let cls = service(broken);
        let result = cls.find_usage(&CancellationToken::new()).await;
        assert!(matches!(result, Err(LimitCheckerError::FetchError { .. })));
        assert!(!cls.have_usage());
        assert_eq!(cls.get_limits()["Bundles"].usage_count(), 0);
        assert_eq!(cls.get_limits()["Workspaces"].usage_count(), 0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("STANDARD"), vec!["Workspaces", "STANDARD"]);
        assert_eq!(classify("GRAPHICS"), vec!["GRAPHICS"]);
        assert_eq!(classify("GRAPHICS_G4DN"), vec!["GRAPHICS"]);
        assert_eq!(classify("POWERPRO"), vec!["Workspaces"]);
    }

    #[test]
    fn test_required_iam_permissions() {
        let cls = service(Snapshot::default());
        assert_eq!(
            cls.required_iam_permissions(),
            &[
                "workspaces:DescribeWorkspaceBundles",
                "workspaces:DescribeWorkspaceImages",
                "workspaces:DescribeWorkspaces",
            ]
        );
    }
}
