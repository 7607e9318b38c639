//! Configuration for clusterforge.
//!
//! Everything the orchestrator reads from the process environment is captured
//! once in [`ProvisionerOptions`] and passed down explicitly, so two runs in
//! one process never observe each other's settings.

use crate::runtime::constants::{TERRAFORM_BIN, envs as const_envs, gateway, polling};
use crate::runtime::layout::dirs as const_dirs;
use crate::util::split_list;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Backend environment
// ============================================================================

/// Which cloud-management gateway to talk to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendEnvironment {
    Production,
    #[default]
    Staging,
    Integration,
    Local,
    /// Explicit URL, typically from `RHCS_URL`.
    Custom(String),
}

impl BackendEnvironment {
    /// Parse an `RHCS_ENV` selector.
    pub fn parse(raw: &str) -> ForgeResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" | "stage" | "" => Ok(Self::Staging),
            "integration" | "int" => Ok(Self::Integration),
            "local" => Ok(Self::Local),
            other => Err(ForgeError::Config(format!(
                "unknown backend environment '{other}' (expected production, staging, integration or local)"
            ))),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Production => gateway::PRODUCTION,
            Self::Staging => gateway::STAGING,
            Self::Integration => gateway::INTEGRATION,
            Self::Local => gateway::LOCAL,
            Self::Custom(url) => url,
        }
    }

    /// Local gateways accept the raw token without an SSO exchange.
    pub fn exchanges_token(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

// ============================================================================
// Profile overrides
// ============================================================================

/// Environment overrides applied to a profile exactly once, at load time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    pub region: Option<String>,
    pub version: Option<String>,
    pub major_version: Option<String>,
    pub channel_group: Option<String>,
    pub compute_machine_type: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_name_prefix: Option<String>,
    pub cluster_name_suffix: Option<String>,
}

// ============================================================================
// Network override
// ============================================================================

/// Pre-existing subnets that replace the network stages entirely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingNetwork {
    pub subnet_ids: Vec<String>,
    pub availability_zones: Vec<String>,
}

// ============================================================================
// Poll options
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: polling::INTERVAL,
            timeout: polling::TIMEOUT,
        }
    }
}

// ============================================================================
// Provisioner Options
// ============================================================================

/// Configuration options for [`Provisioner`](crate::runtime::Provisioner).
///
/// Users can create it with defaults and modify fields as needed, or read
/// the whole thing from the process environment with [`Self::from_env`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisionerOptions {
    /// State root: working directories and logs.
    pub home_dir: PathBuf,

    /// Directory holding the YAML profile catalogs.
    pub profiles_dir: Option<PathBuf>,

    /// Root of the engine manifests (`{root}/{provider}/{resource}/{cluster_type}`).
    pub manifests_dir: Option<PathBuf>,

    /// Artifact directory. `None` means `{home}/output`.
    pub output_dir: Option<PathBuf>,

    /// Offline token for the backend. Never serialized.
    #[serde(skip)]
    pub token: Option<String>,

    #[serde(default)]
    pub gateway: BackendEnvironment,

    pub terraform_bin: String,

    /// Skip all destroy work on decommission.
    #[serde(default)]
    pub no_destroy: bool,

    /// Credentials file for the account that owns the shared VPC.
    pub shared_vpc_credentials_file: Option<PathBuf>,

    pub existing_network: Option<ExistingNetwork>,

    /// Known cluster id; skips reading it back from the cluster stage.
    pub cluster_id: Option<String>,

    /// Value of the `qe_usage` custom property.
    #[serde(default)]
    pub qe_usage: String,

    #[serde(default)]
    pub overrides: ProfileOverrides,

    #[serde(default)]
    pub poll: PollOptions,

    /// Pause after the identity roles are created.
    pub settle_delay: Duration,

    /// Also write the log to stderr, at debug level unless `RUST_LOG` says otherwise.
    #[serde(default)]
    pub log_to_stderr: bool,
}

impl Default for ProvisionerOptions {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            profiles_dir: None,
            manifests_dir: None,
            output_dir: None,
            token: None,
            gateway: BackendEnvironment::default(),
            terraform_bin: TERRAFORM_BIN.to_string(),
            no_destroy: false,
            shared_vpc_credentials_file: None,
            existing_network: None,
            cluster_id: None,
            qe_usage: String::new(),
            overrides: ProfileOverrides::default(),
            poll: PollOptions::default(),
            settle_delay: crate::runtime::constants::defaults::ROLE_SETTLE_DELAY,
            log_to_stderr: false,
        }
    }
}

fn default_home_dir() -> PathBuf {
    let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(const_dirs::CLUSTERFORGE_DIR);
    path
}

impl ProvisionerOptions {
    /// Read options from the process environment.
    pub fn from_env() -> ForgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ForgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut options = Self::default();

        if let Some(home) = get(const_envs::CLUSTERFORGE_HOME) {
            options.home_dir = PathBuf::from(home);
        }
        options.profiles_dir = get(const_envs::PROFILES_DIR).map(PathBuf::from);
        options.manifests_dir = get(const_envs::MANIFESTS_DIR).map(PathBuf::from);
        options.output_dir = get(const_envs::OUTPUT_DIR).map(PathBuf::from);
        options.token = get(const_envs::TOKEN);

        options.gateway = match (get(const_envs::GATEWAY_URL), get(const_envs::ENVIRONMENT)) {
            (Some(url), _) => BackendEnvironment::Custom(url),
            (None, Some(env)) => BackendEnvironment::parse(&env)?,
            (None, None) => BackendEnvironment::default(),
        };

        if let Some(bin) = get(const_envs::TERRAFORM_BIN) {
            options.terraform_bin = bin;
        }

        options.no_destroy = get(const_envs::NO_CLUSTER_DESTROY)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        options.shared_vpc_credentials_file =
            get(const_envs::SHARED_VPC_CREDENTIALS_FILE).map(PathBuf::from);
        options.cluster_id = get(const_envs::CLUSTER_ID);
        options.qe_usage = get(const_envs::QE_USAGE).unwrap_or_default();

        // Both halves are required; a lone subnet list is ignored.
        options.existing_network = match (
            get(const_envs::SUBNET_IDS),
            get(const_envs::AVAILABILITY_ZONES),
        ) {
            (Some(subnets), Some(zones)) => Some(ExistingNetwork {
                subnet_ids: split_list(&subnets),
                availability_zones: split_list(&zones),
            }),
            _ => None,
        };

        options.overrides = ProfileOverrides {
            region: get(const_envs::REGION),
            version: get(const_envs::VERSION),
            major_version: get(const_envs::MAJOR_VERSION),
            channel_group: get(const_envs::CHANNEL_GROUP),
            compute_machine_type: get(const_envs::COMPUTE_MACHINE_TYPE),
            cluster_name: get(const_envs::CLUSTER_NAME),
            cluster_name_prefix: get(const_envs::CLUSTER_NAME_PREFIX),
            cluster_name_suffix: get(const_envs::CLUSTER_NAME_SUFFIX),
        };

        Ok(options)
    }

    /// Artifact directory after defaulting.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.home_dir.join(const_dirs::OUTPUT_DIR))
    }

    /// Reject combinations that cannot work before any directory is touched.
    pub fn sanitize(&self) -> ForgeResult<()> {
        if !self.home_dir.is_absolute() {
            return Err(ForgeError::Config(format!(
                "home_dir must be absolute path, got: {}",
                self.home_dir.display()
            )));
        }
        if self.poll.interval.is_zero() {
            return Err(ForgeError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.terraform_bin.trim().is_empty() {
            return Err(ForgeError::Config("terraform binary is empty".to_string()));
        }
        if let Some(network) = &self.existing_network
            && network.subnet_ids.is_empty()
        {
            return Err(ForgeError::Config(format!(
                "{} is set but contains no subnet ids",
                const_envs::SUBNET_IDS
            )));
        }
        Ok(())
    }
}
