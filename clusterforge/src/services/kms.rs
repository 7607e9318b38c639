//! Customer-managed encryption key.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct Kms;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsArgs {
    pub kms_name: String,
    pub aws_region: String,
    /// Roles granted use of the key. Absent without identity roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_role_prefix: Option<String>,
    #[serde(rename = "path", skip_serializing_if = "String::is_empty")]
    pub account_role_path: String,
    pub tag_key: String,
    pub tag_value: String,
    pub tag_description: String,
    pub hcp: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KmsOutput {
    #[serde(rename = "arn")]
    pub key_arn: String,
}

impl ResourceKind for Kms {
    type Args = KmsArgs;
    type Output = KmsOutput;

    const NAME: &'static str = "encryption-key";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::KMS;
}
