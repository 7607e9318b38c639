//! Desired-state profiles.
//!
//! A profile is a named set of toggles describing the cluster and the
//! prerequisite resources it needs. Profiles are loaded from a YAML catalog,
//! overridden once from [`ProfileOverrides`], validated, and never mutated
//! afterwards.

mod catalog;

pub use catalog::ProfileCatalog;

use crate::runtime::constants::defaults;
use crate::runtime::options::ProfileOverrides;
use crate::util::split_list;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// CLUSTER TYPE
// ============================================================================

/// Cluster topology. Selects the manifest variant of every stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterType {
    /// Standalone control plane.
    #[default]
    #[serde(rename = "rosa-classic")]
    Classic,

    /// Hosted control plane.
    #[serde(rename = "rosa-hcp")]
    Hcp,
}

impl ClusterType {
    pub fn is_hcp(&self) -> bool {
        matches!(self, ClusterType::Hcp)
    }

    /// Manifest directory name for this topology.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Classic => "rosa-classic",
            ClusterType::Hcp => "rosa-hcp",
        }
    }
}

impl std::str::FromStr for ClusterType {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rosa-classic" | "classic" => Ok(ClusterType::Classic),
            "rosa-hcp" | "hcp" => Ok(ClusterType::Hcp),
            other => Err(ForgeError::InvalidArgument(format!(
                "unknown cluster type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PROFILE
// ============================================================================

/// Validated desired-state descriptor.
///
/// Field names follow the YAML keys of the catalog. Every field has a zero
/// default, so catalog entries only list what they turn on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Catalog entry name. Set by the catalog, not read from the `cluster` map.
    #[serde(skip)]
    pub name: String,

    pub cluster_name: String,
    pub domain_prefix: String,
    pub cluster_type: ClusterType,
    pub product_id: String,

    #[serde(deserialize_with = "lenient_string")]
    pub major_version: String,
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(deserialize_with = "lenient_string")]
    pub version_pattern: String,
    pub channel_group: String,

    pub cloud_provider: String,
    pub region: String,
    pub instance_type: String,
    /// Comma separated zone list, with or without the region prefix.
    pub zones: String,

    #[serde(rename = "etcd_encryption")]
    pub etcd: bool,
    pub fips: bool,
    pub ccs: bool,
    pub sts: bool,
    #[serde(rename = "autoscaling_enabled")]
    pub autoscale: bool,
    pub multi_az: bool,
    pub byovpc: bool,
    pub private_link: bool,
    pub private: bool,
    pub byok: bool,
    /// Customer-managed key for the cluster volumes.
    #[serde(rename = "kms_key_arn")]
    pub kms_key: bool,
    pub different_encryption_keys: bool,
    pub networking_set: bool,
    pub proxy: bool,
    pub oidc_config: String,

    pub ec2_metadata_http_tokens: String,
    pub compute_replicas: u32,
    pub compute_machine_type: String,

    pub admin_enabled: bool,
    pub labeling: bool,
    pub tagging: bool,
    pub worker_disk_size: u32,
    pub additional_sg_number: u32,
    #[serde(rename = "unified_acc_role_path")]
    pub unified_acc_roles_path: String,
    pub shared_vpc: bool,

    pub machine_cidr: String,
    pub service_cidr: String,
    pub pod_cidr: String,
    pub host_prefix: u32,

    pub full_resources: bool,
    #[serde(rename = "no_wait_cluster")]
    pub dont_wait_for_cluster: bool,

    pub use_registry_config: bool,
    pub allowed_registries: Vec<String>,
    pub blocked_registries: Vec<String>,

    /// Excluded from random selection.
    pub need_specific_config: bool,
}

/// Accept scalars written as YAML numbers (`version: 4.14`) as strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, got {other:?}"
        ))),
    }
}

impl Profile {
    pub fn is_hcp(&self) -> bool {
        self.cluster_type.is_hcp()
    }

    /// Explicit zones, empty when the profile asks for a zone count instead.
    pub fn zone_list(&self) -> Vec<String> {
        split_list(&self.zones)
    }

    /// Whether an encryption key stage is needed at all.
    pub fn needs_kms(&self) -> bool {
        self.etcd || self.kms_key
    }

    /// Whether a second, independently scoped key is needed for etcd.
    pub fn needs_etcd_kms(&self) -> bool {
        self.kms_key && self.is_hcp() && self.different_encryption_keys
    }

    /// Apply environment overrides and fill defaults.
    ///
    /// Called exactly once by the catalog while loading.
    pub(crate) fn apply_overrides(&mut self, overrides: &ProfileOverrides) {
        fn set(field: &mut String, value: &Option<String>, key: &str, profile: &str) {
            if let Some(value) = value {
                tracing::info!(
                    profile = %profile,
                    key,
                    value = %value,
                    "overriding profile setting from environment"
                );
                *field = value.clone();
            }
        }

        let name = self.name.clone();
        set(&mut self.channel_group, &overrides.channel_group, "channel_group", &name);
        set(&mut self.version, &overrides.version, "version", &name);
        set(&mut self.region, &overrides.region, "region", &name);
        set(&mut self.major_version, &overrides.major_version, "major_version", &name);
        set(
            &mut self.compute_machine_type,
            &overrides.compute_machine_type,
            "compute_machine_type",
            &name,
        );
        set(&mut self.cluster_name, &overrides.cluster_name, "cluster_name", &name);

        if !self.allowed_registries.is_empty() || !self.blocked_registries.is_empty() {
            self.use_registry_config = true;
        }
        if self.version.is_empty() {
            self.version = defaults::VERSION.to_string();
        }
        if self.channel_group.is_empty() {
            self.channel_group = defaults::CHANNEL_GROUP.to_string();
        }
        if self.region.is_empty() {
            self.region = defaults::REGION.to_string();
        }
    }

    /// Reject flag combinations no stage plan can satisfy.
    pub fn validate(&self) -> ForgeResult<()> {
        let fail = |msg: &str| -> ForgeResult<()> {
            Err(ForgeError::Profile(format!("{}: {msg}", self.name)))
        };

        if self.name.trim().is_empty() {
            return Err(ForgeError::Profile("profile name is empty".to_string()));
        }
        if self.private_link && !self.private {
            return fail("private_link requires private");
        }
        if self.shared_vpc && !self.byovpc {
            return fail("shared_vpc requires byovpc");
        }
        if self.different_encryption_keys && !self.kms_key {
            return fail("different_encryption_keys requires kms_key_arn");
        }
        if self.proxy && !self.byovpc {
            return fail("proxy requires byovpc");
        }
        if self.additional_sg_number > 0 && !self.byovpc {
            return fail("additional_sg_number requires byovpc");
        }
        Ok(())
    }
}
