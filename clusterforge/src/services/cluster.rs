//! The cluster itself: the final request assembled from every stage.

use super::ResourceKind;
use crate::runtime::constants::manifests;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub struct Cluster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autoscaling {
    pub autoscaling_enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateHostedZone {
    pub id: String,
    pub role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
    pub additional_trust_bundle: String,
}

/// Cluster creation request.
///
/// Every optional field is left out of the variables file when unset, so
/// the manifest defaults apply. Fields fed by a stage output stay `None`
/// until that stage has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterArgs {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openshift_version: Option<String>,
    pub aws_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_availability_zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_subnet_ids: Option<Vec<String>>,

    pub multi_az: bool,
    pub fips: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_prefix: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<Autoscaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec2_metadata_http_tokens: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_mp_labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_credentials: Option<AdminCredentials>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_role_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_role_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_config_id: Option<String>,
    #[serde(rename = "path", skip_serializing_if = "Option::is_none")]
    pub unified_acc_roles_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dns_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_hosted_zone: Option<PrivateHostedZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_compute_security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_infra_security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_control_plane_security_groups: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etcd_encryption: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etcd_kms_key_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_disk_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_resources: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_cluster: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_registries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_registries: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterOutput {
    pub cluster_id: String,
}

impl ResourceKind for Cluster {
    type Args = ClusterArgs;
    type Output = ClusterOutput;

    const NAME: &'static str = "cluster";
    const PROVIDER: &'static str = manifests::RHCS;
    const MANIFEST: &'static str = manifests::CLUSTERS;
    const PER_CLUSTER_TYPE: bool = true;
}
