use clap::{Args, Parser, Subcommand};
use clusterforge::runtime::constants::envs;
use clusterforge::{Provisioner, ProvisionerOptions};
use std::path::{Path, PathBuf};

use crate::commands::{cluster_id, create, destroy, plan, profiles, version};

/// Provision validation clusters from named profiles.
#[derive(Parser, Debug)]
#[command(name = "clusterforge", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog profiles
    Profiles(profiles::ProfilesArgs),
    /// Print the stage order of a profile without running anything
    Plan(plan::PlanArgs),
    /// Resolve the cluster version a profile would install
    Version(version::VersionArgs),
    /// Provision a profile and print the cluster id
    Create(create::CreateArgs),
    /// Destroy the cluster and every stage of a profile
    Destroy(destroy::DestroyArgs),
    /// Print the id of the cluster managed for a profile
    ClusterId(cluster_id::ClusterIdArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// State directory (working directories and logs)
    #[arg(long, global = true, env = envs::CLUSTERFORGE_HOME)]
    pub home: Option<PathBuf>,

    /// Directory holding the YAML profile catalogs
    #[arg(long, global = true, env = envs::PROFILES_DIR)]
    pub profiles_dir: Option<PathBuf>,

    /// Root of the engine manifests
    #[arg(long, global = true, env = envs::MANIFESTS_DIR)]
    pub manifests_dir: Option<PathBuf>,

    /// Directory for persisted artifacts
    #[arg(long, global = true, env = envs::OUTPUT_DIR)]
    pub output_dir: Option<PathBuf>,

    /// Also log to stderr, at debug level
    #[arg(long, global = true)]
    pub debug: bool,
}

impl GlobalFlags {
    /// Options from the environment, with explicit flags on top.
    pub fn options(&self) -> anyhow::Result<ProvisionerOptions> {
        let mut options = ProvisionerOptions::from_env()?;
        if let Some(home) = &self.home {
            options.home_dir = absolute(home)?;
        }
        if let Some(dir) = &self.profiles_dir {
            options.profiles_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.manifests_dir {
            options.manifests_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            options.output_dir = Some(dir.clone());
        }
        options.log_to_stderr = self.debug;
        Ok(options)
    }

    pub fn create_provisioner(&self) -> anyhow::Result<Provisioner> {
        Ok(Provisioner::new(self.options()?)?)
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
