//! OIDC provider and the per-cluster operator roles federated to it.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct OperatorRoles;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRolesArgs {
    pub account_role_prefix: String,
    pub operator_role_prefix: String,
    /// `managed`, `un-managed` or empty for the provider default.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub oidc_config: String,
    #[serde(rename = "path", skip_serializing_if = "String::is_empty")]
    pub unified_acc_roles_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OperatorRolesOutput {
    pub oidc_config_id: String,
    pub account_role_prefix: String,
    pub operator_role_prefix: String,
    pub ingress_operator_role_arn: String,
}

impl ResourceKind for OperatorRoles {
    type Args = OperatorRolesArgs;
    type Output = OperatorRolesOutput;

    const NAME: &'static str = "operator-role";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::OPERATOR_ROLES;
    const PER_CLUSTER_TYPE: bool = true;
}
