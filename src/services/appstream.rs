//! # AppStream Probe
//!
//! Counts stacks, fleets, image builders and private images, and measures the largest
//! desired capacity configured on any single fleet.

use super::{LimitMap, ServiceBase, ServiceProbe};
use crate::config::ThresholdConfig;
use crate::connection::{Connector, DataSource, Paginator};
use crate::error::CheckerResult;
use crate::models::{LimitSpec, UsageObservation};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const STACKS: &str = "Stacks";
const FLEETS: &str = "Fleets";
const FLEET_CAPACITY: &str = "Fleet capacity";
const IMAGE_BUILDERS: &str = "Image builders";
const IMAGES: &str = "Images";

static DEFAULT_LIMITS: [LimitSpec; 5] = [
    LimitSpec::count(STACKS, 10, "AWS::AppStream::Stack"),
    LimitSpec::count(FLEETS, 10, "AWS::AppStream::Fleet"),
    LimitSpec::instance_value(FLEET_CAPACITY, 50, "AWS::AppStream::Fleet"),
    LimitSpec::count(IMAGE_BUILDERS, 10, "AWS::AppStream::ImageBuilder"),
    LimitSpec::count(IMAGES, 50, "AWS::AppStream::Image"),
];

static IAM_PERMISSIONS: [&str; 4] = [
    "appstream:DescribeFleets",
    "appstream:DescribeImageBuilders",
    "appstream:DescribeImages",
    "appstream:DescribeStacks",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Stack {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Fleet {
    name: String,
    #[serde(default)]
    compute_capacity_status: Option<ComputeCapacityStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComputeCapacityStatus {
    desired: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageBuilder {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Image {
    name: String,
    #[serde(default)]
    visibility: Option<String>,
}

#[derive(Debug)]
pub struct AppStreamService {
    base: ServiceBase,
}

impl AppStreamService {
    pub const SERVICE_NAME: &'static str = "AppStream";
    pub const API_NAME: &'static str = "appstream";

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
        let stacks: Vec<Stack> = Paginator::new(conn.as_ref(), "DescribeStacks", cancel)
            .collect_all()
            .await?;
        let stacks_limit = self.base.limit(STACKS)?;
        for stack in stacks {
            stacks_limit.add_current_usage(
                UsageObservation::new(1.0)
                    .with_resource_id(stack.name)
                    .with_aws_type("AWS::AppStream::Stack"),
            );
        }

        let fleets: Vec<Fleet> = Paginator::new(conn.as_ref(), "DescribeFleets", cancel)
            .collect_all()
            .await?;
        let fleets_limit = self.base.limit(FLEETS)?;
        let capacity_limit = self.base.limit(FLEET_CAPACITY)?;
        for fleet in fleets {
            fleets_limit.add_current_usage(
                UsageObservation::new(1.0)
                    .with_resource_id(fleet.name.as_str())
                    .with_aws_type("AWS::AppStream::Fleet"),
            );
            if let Some(capacity) = fleet.compute_capacity_status {
                capacity_limit.add_current_usage(
                    UsageObservation::new(capacity.desired as f64)
                        .with_resource_id(fleet.name)
                        .with_label("desired capacity")
                        .with_aws_type("AWS::AppStream::Fleet"),
                );
            }
        }

        let builders: Vec<ImageBuilder> =
            Paginator::new(conn.as_ref(), "DescribeImageBuilders", cancel)
                .collect_all()
                .await?;
        let builders_limit = self.base.limit(IMAGE_BUILDERS)?;
        for builder in builders {
            builders_limit.add_current_usage(
                UsageObservation::new(1.0)
                    .with_resource_id(builder.name)
                    .with_aws_type("AWS::AppStream::ImageBuilder"),
            );
        }

        let images: Vec<Image> = Paginator::new(conn.as_ref(), "DescribeImages", cancel)
            .collect_all()
            .await?;
        let images_limit = self.base.limit(IMAGES)?;
        for image in images
            .into_iter()
            .filter(|image| image.visibility.as_deref() == Some("PRIVATE"))
        {
            images_limit.add_current_usage(
                UsageObservation::new(1.0)
                    .with_resource_id(image.name)
                    .with_aws_type("AWS::AppStream::Image"),
            );
        }

        Ok(())
    }
}

#[async_trait]
impl ServiceProbe for AppStreamService {
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
