#![allow(dead_code)]

use assert_cmd::Command;
use clusterforge::runtime::constants::envs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Variables the binary reads that must not leak in from the caller's shell.
const SCRUBBED_ENVS: &[&str] = &[
    envs::CLUSTERFORGE_HOME,
    envs::TOKEN,
    envs::GATEWAY_URL,
    envs::ENVIRONMENT,
    envs::PROFILES_DIR,
    envs::MANIFESTS_DIR,
    envs::OUTPUT_DIR,
    envs::CLUSTER_ID,
    envs::NO_CLUSTER_DESTROY,
    envs::REGION,
    envs::VERSION,
    envs::MAJOR_VERSION,
    envs::CLUSTER_NAME,
    envs::SUBNET_IDS,
    envs::AVAILABILITY_ZONES,
];

/// Isolated home and fixture catalog for one test.
pub struct TestContext {
    pub cmd: Command,
    pub temp: TempDir,
}

impl TestContext {
    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.temp.path().join("profiles")
    }

    /// Fresh command sharing this context's home and catalog.
    pub fn new_cmd(&self) -> Command {
        command(&self.home(), Some(&self.profiles_dir()))
    }
}

fn command(home: &Path, profiles_dir: Option<&Path>) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_clusterforge"));
    cmd.timeout(Duration::from_secs(30));
    for name in SCRUBBED_ENVS {
        cmd.env_remove(name);
    }
    cmd.arg("--home").arg(home);
    if let Some(dir) = profiles_dir {
        cmd.arg("--profiles-dir").arg(dir);
    }
    cmd
}

pub fn clusterforge() -> TestContext {
    let temp = TempDir::new().expect("create temp dir");
    clusterforge_test_utils::profiles::write_catalog(&temp.path().join("profiles"));
    let cmd = command(&temp.path().join("home"), Some(&temp.path().join("profiles")));
    TestContext { cmd, temp }
}

/// Context without a profiles directory.
pub fn clusterforge_without_catalog() -> TestContext {
    let temp = TempDir::new().expect("create temp dir");
    let cmd = command(&temp.path().join("home"), None);
    TestContext { cmd, temp }
}
