//! Additional security groups attached to the cluster machine pools.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct SecurityGroups;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupsArgs {
    pub aws_region: String,
    pub vpc_id: String,
    pub sg_number: u32,
    pub name_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityGroupsOutput {
    pub sg_ids: Vec<String>,
}

impl ResourceKind for SecurityGroups {
    type Args = SecurityGroupsArgs;
    type Output = SecurityGroupsOutput;

    const NAME: &'static str = "security-groups";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::SECURITY_GROUPS;
}
