//! Constants shared between the orchestrator library and the CLI.
//!
//! Environment variable names live here so that clap `env = ...` attributes
//! and `ProvisionerOptions::from_env` always agree.

/// Process environment variables.
pub mod envs {
    /// State root for working directories and logs.
    pub const CLUSTERFORGE_HOME: &str = "CLUSTERFORGE_HOME";

    /// Offline token for the cloud-management backend.
    pub const TOKEN: &str = "RHCS_TOKEN";

    /// Explicit backend gateway URL. Wins over `RHCS_ENV`.
    pub const GATEWAY_URL: &str = "RHCS_URL";

    /// Backend environment selector: production, staging, integration, local.
    pub const ENVIRONMENT: &str = "RHCS_ENV";

    pub const CLUSTER_PROFILE: &str = "CLUSTER_PROFILE";
    pub const PROFILES_DIR: &str = "PROFILES_DIR";
    pub const MANIFESTS_DIR: &str = "MANIFESTS_FOLDER";
    pub const OUTPUT_DIR: &str = "RHCS_OUTPUT";
    pub const TERRAFORM_BIN: &str = "TERRAFORM_BIN";

    pub const CLUSTER_ID: &str = "CLUSTER_ID";
    pub const NO_CLUSTER_DESTROY: &str = "NO_CLUSTER_DESTROY";
    pub const QE_USAGE: &str = "QE_USAGE";

    pub const SHARED_VPC_CREDENTIALS_FILE: &str = "SHARED_VPC_AWS_SHARED_CREDENTIALS_FILE";
    pub const SUBNET_IDS: &str = "SUBNET_IDS";
    pub const AVAILABILITY_ZONES: &str = "AVAILABILITY_ZONES";

    // Profile overrides, applied once at load time.
    pub const REGION: &str = "REGION";
    pub const VERSION: &str = "VERSION";
    pub const MAJOR_VERSION: &str = "MAJOR_VERSION";
    pub const CHANNEL_GROUP: &str = "CHANNEL_GROUP";
    pub const COMPUTE_MACHINE_TYPE: &str = "COMPUTE_MACHINE_TYPE";
    pub const CLUSTER_NAME: &str = "RHCS_CLUSTER_NAME";
    pub const CLUSTER_NAME_PREFIX: &str = "RHCS_CLUSTER_NAME_PREFIX";
    pub const CLUSTER_NAME_SUFFIX: &str = "RHCS_CLUSTER_NAME_SUFFIX";
}

/// Cloud-management backend endpoints.
pub mod gateway {
    pub const PRODUCTION: &str = "https://api.openshift.com";
    pub const STAGING: &str = "https://api.stage.openshift.com";
    pub const INTEGRATION: &str = "https://api.integration.openshift.com";
    pub const LOCAL: &str = "http://localhost:8000";

    /// SSO endpoint used to exchange the offline token.
    pub const TOKEN_URL: &str =
        "https://sso.redhat.com/auth/realms/redhat-external/protocol/openid-connect/token";
    pub const CLIENT_ID: &str = "cloud-services";
}
