//! Provisioner: the library entry point.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::ClusterManager;
use crate::engine::{InfraEngine, TerraformEngine};
use crate::init_logging_for;
use crate::orchestrator::{Orchestrator, ProvisionOutcome, StageGraph};
use crate::profile::{Profile, ProfileCatalog};
use crate::runtime::constants::envs;
use crate::runtime::layout::FilesystemLayout;
use crate::runtime::options::ProvisionerOptions;
use crate::services::Services;
use crate::versions::resolve_version;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use tracing_appender::non_blocking::WorkerGuard;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Entry point for planning, provisioning and decommissioning profiles.
///
/// **Prepare Before Execute**: options are validated, the home directory is
/// laid out and the catalog is loaded before the constructor returns.
///
/// **Cloning**: cheap via `Arc`; all clones share the catalog, the engine and
/// the backend client. Each profile still gets its own state scope, so two
/// clones may provision different profiles concurrently.
#[derive(Clone)]
pub struct Provisioner {
    inner: ProvisionerInner,
}

type ProvisionerInner = Arc<ProvisionerInnerImpl>;

/// Immutable after construction; no lock needed.
struct ProvisionerInnerImpl {
    options: ProvisionerOptions,
    layout: FilesystemLayout,
    catalog: ProfileCatalog,
    engine: Arc<dyn InfraEngine>,
    manager: Option<Arc<dyn ClusterManager>>,
    _log_guard: WorkerGuard,
}

// ============================================================================
// PROVISIONER IMPLEMENTATION
// ============================================================================

impl Provisioner {
    /// Create a provisioner backed by the terraform binary and, when a token
    /// is configured, the REST backend.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The options are inconsistent (see [`ProvisionerOptions::sanitize`])
    /// - The home directory cannot be created
    /// - The profile catalog cannot be read
    pub fn new(options: ProvisionerOptions) -> ForgeResult<Self> {
        let engine: Arc<dyn InfraEngine> = Arc::new(TerraformEngine::new(&options.terraform_bin));
        let manager = Self::default_manager(&options)?;
        Self::with_backends(options, engine, manager)
    }

    #[cfg(feature = "rest")]
    fn default_manager(
        options: &ProvisionerOptions,
    ) -> ForgeResult<Option<Arc<dyn ClusterManager>>> {
        match &options.token {
            Some(token) => {
                let client =
                    crate::backend::RestClusterManager::new(&options.gateway, token.clone())?;
                Ok(Some(Arc::new(client)))
            }
            None => Ok(None),
        }
    }

    #[cfg(not(feature = "rest"))]
    fn default_manager(
        _options: &ProvisionerOptions,
    ) -> ForgeResult<Option<Arc<dyn ClusterManager>>> {
        Ok(None)
    }

    /// Create a provisioner with explicit engine and backend.
    ///
    /// `manager` may be `None` for offline use: listing and planning work,
    /// anything that talks to the backend fails with a config error.
    pub fn with_backends(
        options: ProvisionerOptions,
        engine: Arc<dyn InfraEngine>,
        manager: Option<Arc<dyn ClusterManager>>,
    ) -> ForgeResult<Self> {
        // Validate Early: Check preconditions before touching the filesystem
        options.sanitize()?;

        let layout = FilesystemLayout::new(options.home_dir.clone());
        layout.prepare().map_err(|e| {
            ForgeError::Storage(format!(
                "Failed to initialize filesystem at {}: {}",
                layout.home_dir().display(),
                e
            ))
        })?;

        let log_guard = init_logging_for(&layout, options.log_to_stderr)?;

        let catalog = match &options.profiles_dir {
            Some(dir) => ProfileCatalog::load(dir)?,
            None => ProfileCatalog::default(),
        };

        let inner = Arc::new(ProvisionerInnerImpl {
            options,
            layout,
            catalog,
            engine,
            manager,
            _log_guard: log_guard,
        });

        tracing::debug!(
            home = %inner.layout.home_dir().display(),
            profiles = inner.catalog.len(),
            backend = inner.manager.is_some(),
            "initialized provisioner"
        );

        Ok(Self { inner })
    }

    pub fn options(&self) -> &ProvisionerOptions {
        &self.inner.options
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.inner.layout
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.inner.catalog
    }

    /// Load `name` from the catalog with the configured overrides applied.
    pub fn profile(&self, name: &str) -> ForgeResult<Profile> {
        if self.inner.catalog.is_empty() && self.inner.options.profiles_dir.is_none() {
            return Err(ForgeError::Config(format!(
                "no profiles loaded; set {} or pass --profiles-dir",
                envs::PROFILES_DIR
            )));
        }
        self.inner.catalog.get(name, &self.inner.options.overrides)
    }

    /// Stage graph of `name`. Needs neither the engine nor the backend.
    pub fn plan(&self, name: &str) -> ForgeResult<StageGraph> {
        let profile = self.profile(name)?;
        Ok(StageGraph::for_profile(
            &profile,
            self.inner.options.existing_network.is_some(),
        ))
    }

    /// Version the profile would install, `None` for the backend default.
    pub async fn resolve_version(&self, name: &str) -> ForgeResult<Option<String>> {
        let profile = self.profile(name)?;
        let manager = self.manager()?;
        resolve_version(manager.as_ref(), &profile).await
    }

    /// Orchestrator for one profile, scoped to its own working directories.
    pub fn orchestrator(&self, name: &str) -> ForgeResult<Orchestrator> {
        let profile = self.profile(name)?;
        let services = self.services_for(&profile)?;
        let manager = self.manager()?;
        Ok(Orchestrator::new(
            profile,
            self.inner.options.clone(),
            services,
            manager,
        ))
    }

    pub async fn provision(&self, name: &str) -> ForgeResult<ProvisionOutcome> {
        self.orchestrator(name)?.provision().await
    }

    pub async fn decommission(&self, name: &str) -> ForgeResult<()> {
        self.orchestrator(name)?.decommission().await
    }

    pub async fn retrieve_cluster_id(&self, name: &str) -> ForgeResult<String> {
        self.orchestrator(name)?.retrieve_cluster_id().await
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

impl Provisioner {
    fn manifests_root(&self) -> ForgeResult<PathBuf> {
        self.inner.options.manifests_dir.clone().ok_or_else(|| {
            ForgeError::Config(format!(
                "{} is required to run stages",
                envs::MANIFESTS_DIR
            ))
        })
    }

    /// Services of the profile's scope; the scope is the profile name.
    fn services_for(&self, profile: &Profile) -> ForgeResult<Services> {
        Ok(Services::new(
            Arc::clone(&self.inner.engine),
            self.inner.layout.workspace(&profile.name),
            self.manifests_root()?,
            profile.cluster_type,
        ))
    }

    fn manager(&self) -> ForgeResult<Arc<dyn ClusterManager>> {
        self.inner.manager.clone().ok_or_else(|| {
            ForgeError::Config(format!(
                "{} is required to talk to the cluster backend",
                envs::TOKEN
            ))
        })
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("home_dir", &self.inner.layout.home_dir())
            .field("profiles", &self.inner.catalog.len())
            .finish()
    }
}

// ============================================================================
// THREAD SAFETY ASSERTIONS
// ============================================================================

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Provisioner>;
};
