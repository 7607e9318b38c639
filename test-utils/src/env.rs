use crate::backend::FakeClusterManager;
use crate::engine::FakeEngine;
use crate::profiles;
use clusterforge::backend::ClusterManager;
use clusterforge::engine::InfraEngine;
use clusterforge::runtime::options::{PollOptions, ProvisionerOptions};
use clusterforge::Provisioner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temp home with the fixture catalog, wired to a [`FakeEngine`] and a
/// [`FakeClusterManager`].
pub struct TestEnv {
    pub temp: TempDir,
    pub engine: Arc<FakeEngine>,
    pub manager: Arc<FakeClusterManager>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        profiles::write_catalog(&temp.path().join("profiles"));
        Self {
            temp,
            engine: Arc::new(FakeEngine::with_default_outputs()),
            manager: Arc::new(FakeClusterManager::with_default_versions()),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    /// Options pointing at the temp dirs, with fast polling and no settle pause.
    pub fn options(&self) -> ProvisionerOptions {
        ProvisionerOptions {
            home_dir: self.temp.path().join("home"),
            profiles_dir: Some(self.temp.path().join("profiles")),
            manifests_dir: Some(self.temp.path().join("manifests")),
            output_dir: Some(self.output_dir()),
            poll: PollOptions {
                interval: Duration::from_millis(10),
                timeout: Duration::from_secs(2),
            },
            settle_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn provisioner(&self) -> Provisioner {
        self.provisioner_with(self.options())
    }

    pub fn provisioner_with(&self, options: ProvisionerOptions) -> Provisioner {
        let engine: Arc<dyn InfraEngine> = self.engine.clone();
        let manager: Arc<dyn ClusterManager> = self.manager.clone();
        Provisioner::with_backends(options, engine, Some(manager)).expect("build provisioner")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
