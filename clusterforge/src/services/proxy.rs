//! Egress proxy instances in the public subnet.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};

pub struct Proxy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyArgs {
    pub proxy_count: u32,
    pub aws_region: String,
    pub vpc_id: String,
    pub subnet_public_id: String,
    /// Where the proxy CA bundle is written.
    pub trust_bundle_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pair_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyEndpoint {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
    pub additional_trust_bundle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProxyOutput {
    pub proxies: Vec<ProxyEndpoint>,
}

impl ResourceKind for Proxy {
    type Args = ProxyArgs;
    type Output = ProxyOutput;

    const NAME: &'static str = "egress-proxy";
    const PROVIDER: &'static str = manifests::AWS;
    const MANIFEST: &'static str = manifests::PROXY;
}
