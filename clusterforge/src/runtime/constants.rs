//! Constants for clusterforge
//!
//! Centralized location for hardcoded values, file names and defaults.

use std::time::Duration;

// Re-export shared constants
pub use clusterforge_shared::constants::{envs, gateway};

/// Profile and cluster defaults.
pub mod defaults {
    use std::time::Duration;

    pub const REGION: &str = "us-east-2";
    pub const VERSION: &str = "latest";
    pub const CHANNEL_GROUP: &str = "stable";
    pub const VPC_CIDR: &str = "10.0.0.0/16";

    /// Prefix for generated cluster names.
    pub const CLUSTER_NAME_PREFIX: &str = "rhcs";

    /// Names longer than this need an explicit domain prefix on shared-VPC clusters.
    pub const MAX_AUTO_DOMAIN_NAME_LEN: usize = 15;

    pub const ADMIN_USER: &str = "rhcs-clusteradmin";
    pub const ADMIN_PASSWORD_LEN: usize = 14;

    pub const AUTOSCALING_MIN_REPLICAS: u32 = 3;
    pub const AUTOSCALING_MAX_REPLICAS: u32 = 6;

    /// Extra security groups created beyond the requested count.
    pub const EXTRA_SECURITY_GROUPS: u32 = 5;
    pub const SECURITY_GROUP_NAME_PREFIX: &str = "rhcs-ci";

    /// Shared-VPC account that hosts the cross-account role.
    pub const SHARED_VPC_ACCOUNT_ID: &str = "641733028092";

    pub const KMS_TAG_KEY: &str = "Purpose";
    pub const KMS_TAG_VALUE: &str = "RHCS automation test";
    pub const KMS_TAG_DESCRIPTION: &str = "BYOK Test Key for API automation";

    /// Pause after account roles so asynchronous IAM propagation settles.
    pub const ROLE_SETTLE_DELAY: Duration = Duration::from_secs(10);

    pub fn machine_pool_labels() -> [(&'static str, &'static str); 1] {
        [("test1", "testdata1")]
    }

    pub fn resource_tags() -> [(&'static str, &'static str); 2] {
        [("tag1", "test_tag1"), ("tag2", "test_tag2")]
    }
}

/// Readiness polling cadence.
pub mod polling {
    use super::Duration;

    pub const INTERVAL: Duration = Duration::from_secs(30);
    pub const TIMEOUT: Duration = Duration::from_secs(60 * 60);
}

/// File naming patterns
pub mod filenames {
    /// Variables file consumed by the engine on apply.
    pub const VARS_FILE: &str = "terraform.tfvars.json";

    /// Copy of the variables of the last successful apply.
    pub const APPLIED_VARS_FILE: &str = "applied.tfvars.json";

    /// Persisted cluster name (output dir).
    pub const CLUSTER_NAME: &str = "cluster-name";

    /// Persisted admin password (output dir).
    pub const CLUSTER_ADMIN_USER: &str = "cluster-admin-user";

    /// Proxy CA bundle path handed to the proxy stage (output dir).
    pub const TRUST_BUNDLE: &str = "ca.cert";

    /// Log file name under `{home}/logs`.
    pub const LOG_FILE: &str = "clusterforge.log";
}

/// Engine manifest directories, relative to the manifests root.
pub mod manifests {
    pub const AWS: &str = "aws";
    pub const RHCS: &str = "rhcs";

    pub const ACCOUNT_ROLES: &str = "account-roles";
    pub const OPERATOR_ROLES: &str = "oidc-provider-operator-roles";
    pub const VPC: &str = "vpc";
    pub const SECURITY_GROUPS: &str = "security-groups";
    pub const PROXY: &str = "proxy";
    pub const KMS: &str = "kms";
    pub const SHARED_VPC: &str = "shared-vpc-policy-and-hosted-zone";
    pub const DNS: &str = "dns";
    pub const CLUSTERS: &str = "clusters";
}

/// Suffix for the duplicate service scope (second encryption key).
pub const DUPLICATE_SCOPE_SUFFIX: &str = "-dup";

/// Default engine binary.
pub const TERRAFORM_BIN: &str = "terraform";
