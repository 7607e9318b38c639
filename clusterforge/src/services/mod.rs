//! Resource services.
//!
//! One service per resource type, all backed by the same engine lifecycle:
//!
//! ```text
//! apply(args)  : write vars -> init -> apply -> record vars
//! output()     : engine output -> typed Output
//! destroy()    : engine destroy with the recorded vars -> drop record
//! ```
//!
//! Resource types only describe themselves through [`ResourceKind`];
//! [`EngineService`] carries the lifecycle for all of them.

pub mod account_roles;
pub mod cluster;
pub mod dns_domain;
pub mod kms;
pub mod operator_roles;
pub mod proxy;
pub mod security_groups;
pub mod shared_vpc;
pub mod vpc;

use crate::engine::{EngineWorkspace, InfraEngine};
use crate::profile::ClusterType;
use crate::runtime::layout::{ResourceDir, WorkspaceLayout};
use async_trait::async_trait;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use account_roles::{AccountRoles, AccountRolesArgs, AccountRolesOutput};
pub use cluster::{
    AdminCredentials, Autoscaling, Cluster, ClusterArgs, ClusterOutput, PrivateHostedZone,
    ProxySettings,
};
pub use dns_domain::{DnsDomain, DnsDomainArgs, DnsDomainOutput};
pub use kms::{Kms, KmsArgs, KmsOutput};
pub use operator_roles::{OperatorRoles, OperatorRolesArgs, OperatorRolesOutput};
pub use proxy::{Proxy, ProxyArgs, ProxyEndpoint, ProxyOutput};
pub use security_groups::{SecurityGroups, SecurityGroupsArgs, SecurityGroupsOutput};
pub use shared_vpc::{SharedVpcPolicy, SharedVpcPolicyArgs, SharedVpcPolicyOutput};
pub use vpc::{Vpc, VpcArgs, VpcOutput};

// ============================================================================
// RESOURCE CONTRACT
// ============================================================================

/// Uniform lifecycle of one resource instance.
#[async_trait]
pub trait ResourceService: Send + Sync {
    type Args: Serialize + Send + Sync;
    type Output: Send;

    /// Label used in logs and stage errors.
    fn name(&self) -> &str;

    /// Converge the resource to `args`. Repeating identical args is a no-op.
    async fn apply(&self, args: &Self::Args) -> ForgeResult<String>;

    /// Realized attributes. Fails with `InvalidState` before a successful apply.
    async fn output(&self) -> ForgeResult<Self::Output>;

    /// Remove the resource. Nothing to remove is not an error.
    async fn destroy(&self) -> ForgeResult<()>;
}

/// Type-erased destroy capability, as consumed by teardown.
#[async_trait]
pub trait StageHandle: Send + Sync {
    fn label(&self) -> &str;
    async fn teardown(&self) -> ForgeResult<()>;
}

#[async_trait]
impl<S> StageHandle for S
where
    S: ResourceService,
{
    fn label(&self) -> &str {
        self.name()
    }

    async fn teardown(&self) -> ForgeResult<()> {
        self.destroy().await
    }
}

/// Static description of a resource type.
pub trait ResourceKind: Send + Sync + 'static {
    type Args: Serialize + Send + Sync;
    type Output: DeserializeOwned + Send;

    /// Default label (`network`, `identity-role`, ...).
    const NAME: &'static str;

    /// Engine provider directory under the manifests root.
    const PROVIDER: &'static str;

    /// Manifest directory, also the working directory name.
    const MANIFEST: &'static str;

    /// Manifest has one variant per cluster type.
    const PER_CLUSTER_TYPE: bool = false;

    fn module_path(manifests_root: &Path, cluster_type: ClusterType) -> PathBuf {
        let base = manifests_root.join(Self::PROVIDER).join(Self::MANIFEST);
        if Self::PER_CLUSTER_TYPE {
            base.join(cluster_type.as_str())
        } else {
            base
        }
    }
}

// ============================================================================
// ENGINE-BACKED SERVICE
// ============================================================================

/// [`ResourceService`] for any [`ResourceKind`], driven through an [`InfraEngine`].
///
/// Owns exactly one working directory; two services never share one unless
/// they are built for the same scope and kind.
pub struct EngineService<K: ResourceKind> {
    engine: Arc<dyn InfraEngine>,
    workspace: EngineWorkspace,
    label: String,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> EngineService<K> {
    pub fn new(engine: Arc<dyn InfraEngine>, workspace: EngineWorkspace) -> Self {
        Self {
            engine,
            workspace,
            label: K::NAME.to_string(),
            _kind: PhantomData,
        }
    }

    /// Replace the label used in logs and errors.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn workspace(&self) -> &EngineWorkspace {
        &self.workspace
    }

    fn dir(&self) -> &ResourceDir {
        self.workspace.dir()
    }

    /// True once an apply succeeded (or vars were recorded) and no destroy followed.
    pub fn is_recorded(&self) -> bool {
        self.dir().applied_vars_file().is_file()
    }

    fn read_recorded(&self) -> ForgeResult<Option<serde_json::Value>> {
        let path = self.dir().applied_vars_file();
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ForgeError::Storage(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw).ok())
    }

    fn write_json(path: &Path, value: &serde_json::Value) -> ForgeResult<()> {
        let body = serde_json::to_string_pretty(value)?;
        std::fs::write(path, body)
            .map_err(|e| ForgeError::Storage(format!("failed to write {}: {e}", path.display())))
    }

    /// Record `args` as applied without running the engine.
    ///
    /// Used when an apply failed half-way so a later destroy still knows
    /// which variables created whatever exists.
    pub fn record_vars(&self, args: &K::Args) -> ForgeResult<()> {
        self.dir().prepare()?;
        let value = serde_json::to_value(args)?;
        Self::write_json(&self.dir().vars_file(), &value)?;
        Self::write_json(&self.dir().applied_vars_file(), &value)?;
        tracing::info!(
            stage = %self.label,
            dir = %self.dir().path().display(),
            "recorded stage variables"
        );
        Ok(())
    }

    async fn read_output(&self) -> ForgeResult<K::Output> {
        let map = self
            .engine
            .output(&self.workspace)
            .await
            .map_err(|e| ForgeError::stage_output(&self.label, e.to_string()))?;

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| ForgeError::stage_output(&self.label, format!("unexpected output: {e}")))
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceService for EngineService<K> {
    type Args = K::Args;
    type Output = K::Output;

    fn name(&self) -> &str {
        &self.label
    }

    async fn apply(&self, args: &K::Args) -> ForgeResult<String> {
        let desired = serde_json::to_value(args)
            .map_err(|e| ForgeError::stage_apply(&self.label, format!("invalid args: {e}")))?;

        if self.read_recorded()?.as_ref() == Some(&desired) && self.read_output().await.is_ok() {
            tracing::info!(stage = %self.label, "stage already converged, skipping apply");
            return Ok(String::new());
        }

        self.engine
            .init(&self.workspace)
            .await
            .map_err(|e| ForgeError::stage_apply(&self.label, e.to_string()))?;

        let vars_file = self.dir().vars_file();
        Self::write_json(&vars_file, &desired)?;

        tracing::info!(stage = %self.label, dir = %self.dir().path().display(), "applying stage");
        let text = self
            .engine
            .apply(&self.workspace, &vars_file)
            .await
            .map_err(|e| ForgeError::stage_apply(&self.label, e.to_string()))?;

        Self::write_json(&self.dir().applied_vars_file(), &desired)?;
        tracing::info!(stage = %self.label, "stage applied");
        Ok(text)
    }

    async fn output(&self) -> ForgeResult<K::Output> {
        if !self.is_recorded() {
            return Err(ForgeError::InvalidState(format!(
                "{} has not been applied",
                self.label
            )));
        }
        self.read_output().await
    }

    async fn destroy(&self) -> ForgeResult<()> {
        let applied = self.dir().applied_vars_file();
        if !applied.is_file() {
            tracing::debug!(stage = %self.label, "nothing recorded, skipping destroy");
            return Ok(());
        }

        tracing::info!(stage = %self.label, dir = %self.dir().path().display(), "destroying stage");
        self.engine.init(&self.workspace).await?;
        self.engine
            .destroy(&self.workspace, &applied)
            .await
            .map_err(|e| ForgeError::Engine(format!("{} destroy failed: {e}", self.label)))?;

        std::fs::remove_file(&applied).map_err(|e| {
            ForgeError::Storage(format!("failed to remove {}: {e}", applied.display()))
        })?;
        let _ = std::fs::remove_file(self.dir().vars_file());

        tracing::info!(stage = %self.label, "stage destroyed");
        Ok(())
    }
}

// ============================================================================
// SERVICE FACTORY
// ============================================================================

/// Builds the services of one state scope.
///
/// The scope is fixed at construction; [`Services::scoped`] derives the
/// sibling scope used for a second, independent instance of a resource.
#[derive(Clone)]
pub struct Services {
    engine: Arc<dyn InfraEngine>,
    layout: WorkspaceLayout,
    manifests_root: PathBuf,
    cluster_type: ClusterType,
}

impl Services {
    pub fn new(
        engine: Arc<dyn InfraEngine>,
        layout: WorkspaceLayout,
        manifests_root: impl Into<PathBuf>,
        cluster_type: ClusterType,
    ) -> Self {
        Self {
            engine,
            layout,
            manifests_root: manifests_root.into(),
            cluster_type,
        }
    }

    /// Same engine and manifests, scope `{scope}{suffix}`.
    pub fn scoped(&self, suffix: &str) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            layout: self.layout.with_suffix(suffix),
            manifests_root: self.manifests_root.clone(),
            cluster_type: self.cluster_type,
        }
    }

    pub fn scope(&self) -> &str {
        self.layout.scope()
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn service<K: ResourceKind>(&self) -> EngineService<K> {
        let dir = self.layout.resource_dir(K::MANIFEST);
        let module = K::module_path(&self.manifests_root, self.cluster_type);
        EngineService::new(Arc::clone(&self.engine), EngineWorkspace::new(dir, module))
    }

    pub fn account_roles(&self) -> EngineService<AccountRoles> {
        self.service()
    }

    pub fn operator_roles(&self) -> EngineService<OperatorRoles> {
        self.service()
    }

    pub fn vpc(&self) -> EngineService<Vpc> {
        self.service()
    }

    pub fn security_groups(&self) -> EngineService<SecurityGroups> {
        self.service()
    }

    pub fn dns_domain(&self) -> EngineService<DnsDomain> {
        self.service()
    }

    pub fn shared_vpc_policy(&self) -> EngineService<SharedVpcPolicy> {
        self.service()
    }

    pub fn proxy(&self) -> EngineService<Proxy> {
        self.service()
    }

    pub fn kms(&self) -> EngineService<Kms> {
        self.service()
    }

    pub fn cluster(&self) -> EngineService<Cluster> {
        self.service()
    }
}
