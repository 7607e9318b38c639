//! Identity roles (account roles) the installer and the cluster assume.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct AccountRoles;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRolesArgs {
    pub account_role_prefix: String,
    /// `major.minor` the role policies are scoped to.
    pub openshift_version: String,
    pub channel_group: String,
    #[serde(rename = "path", skip_serializing_if = "String::is_empty")]
    pub unified_acc_roles_path: String,
    /// Extra trust for the cross-account role of a shared VPC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_vpc_role_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountRolesOutput {
    pub account_role_prefix: String,
    pub aws_account_id: String,
    pub installer_role_arn: String,
}

impl ResourceKind for AccountRoles {
    type Args = AccountRolesArgs;
    type Output = AccountRolesOutput;

    const NAME: &'static str = "identity-role";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::ACCOUNT_ROLES;
    const PER_CLUSTER_TYPE: bool = true;
}
