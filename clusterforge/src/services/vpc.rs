//! Self-supplied network: VPC with private and public subnets.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct Vpc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcArgs {
    pub aws_region: String,
    pub vpc_cidr: String,
    /// Explicit zones; mutually exclusive with `availability_zones_count`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_shared_credentials_files: Option<Vec<String>>,
}

impl VpcArgs {
    /// Zones qualified with the region (`a` becomes `us-east-2a`), or a
    /// zone count of 1, or 3 when `multi_az`.
    pub fn new(region: &str, zones: &[String], multi_az: bool) -> Self {
        let (availability_zones, availability_zones_count) = if zones.is_empty() {
            (None, Some(if multi_az { 3 } else { 1 }))
        } else {
            let qualified = zones
                .iter()
                .map(|zone| {
                    if zone.contains(region) {
                        zone.clone()
                    } else {
                        format!("{region}{zone}")
                    }
                })
                .collect();
            (Some(qualified), None)
        };

        Self {
            aws_region: region.to_string(),
            vpc_cidr: crate::runtime::constants::defaults::VPC_CIDR.to_string(),
            availability_zones,
            availability_zones_count,
            name_prefix: None,
            aws_shared_credentials_files: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VpcOutput {
    pub vpc_id: String,
    pub vpc_cidr: String,
    pub private_subnets: Vec<String>,
    pub public_subnets: Vec<String>,
    #[serde(alias = "azs")]
    pub availability_zones: Vec<String>,
}

impl ResourceKind for Vpc {
    type Args = VpcArgs;
    type Output = VpcOutput;

    const NAME: &'static str = "network";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::VPC;
}
