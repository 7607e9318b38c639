//! Cross-account policy and private hosted zone for a shared VPC.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct SharedVpcPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedVpcPolicyArgs {
    pub shared_vpc_aws_shared_credentials_files: Vec<String>,
    pub region: String,
    pub cluster_name: String,
    pub dns_domain_id: String,
    pub ingress_operator_role_arn: String,
    pub installer_role_arn: String,
    pub cluster_aws_account: String,
    pub vpc_id: String,
    pub subnets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SharedVpcPolicyOutput {
    pub shared_role: String,
    pub hosted_zone_id: String,
    /// Zone names as seen from the cluster account.
    pub azs: Vec<String>,
}

impl ResourceKind for SharedVpcPolicy {
    type Args = SharedVpcPolicyArgs;
    type Output = SharedVpcPolicyOutput;

    const NAME: &'static str = "shared-network-policy";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::SHARED_VPC;
}
