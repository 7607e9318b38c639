//! Reserved base DNS domain for shared-VPC clusters.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct DnsDomain;

/// The domain is allocated by the backend; nothing to configure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDomainArgs {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DnsDomainOutput {
    pub dns_domain_id: String,
}

impl ResourceKind for DnsDomain {
    type Args = DnsDomainArgs;
    type Output = DnsDomainOutput;

    const NAME: &'static str = "dns-domain";
    const PROVIDER: &'static str = manifests::RHCS;
    const MANIFEST: &'static str = manifests::DNS;
}
