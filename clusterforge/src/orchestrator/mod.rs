//! Provisioning orchestration.
//!
//! One [`Orchestrator`] drives one profile through three phases:
//!
//! 1. **Plan**: derive the stage graph from the profile flags.
//! 2. **Realize**: run each stage in topological order, folding its output
//!    into the cluster request, then submit the cluster itself.
//! 3. **Wait**: poll the backend until the cluster is ready.
//!
//! Any failure during phase 2 unwinds every stage created so far, newest
//! first. A readiness failure in phase 3 leaves everything in place so the
//! cluster can be inspected or decommissioned later.

pub mod cluster_args;
pub mod plan;
mod stages;
mod types;

pub use cluster_args::ClusterIdentity;
pub use plan::{StageGraph, StageKind};
pub use types::ProvisionOutcome;

use crate::artifacts::ArtifactStore;
use crate::backend::ClusterManager;
use crate::profile::Profile;
use crate::readiness::ReadinessPoller;
use crate::runtime::constants::defaults;
use crate::runtime::options::ProvisionerOptions;
use crate::services::{ClusterArgs, ResourceService, Services, StageHandle};
use crate::teardown::{TeardownCoordinator, sweep};
use crate::util::{generate_cluster_name, random_name, random_password};
use crate::versions::resolve_version;
use clusterforge_shared::errors::{ForgeError, ForgeResult, TeardownFailure};
use stages::{StageRunner, stage_handle};
use std::sync::Arc;

/// Label of the cluster entry in teardown reports.
const CLUSTER_LABEL: &str = "cluster";

pub struct Orchestrator {
    profile: Profile,
    options: ProvisionerOptions,
    services: Services,
    manager: Arc<dyn ClusterManager>,
    artifacts: ArtifactStore,
    poller: ReadinessPoller,
}

impl Orchestrator {
    pub fn new(
        profile: Profile,
        options: ProvisionerOptions,
        services: Services,
        manager: Arc<dyn ClusterManager>,
    ) -> Self {
        let artifacts = ArtifactStore::new(options.resolved_output_dir());
        let poller = ReadinessPoller::from_options(&options.poll);
        Self {
            profile,
            options,
            services,
            manager,
            artifacts,
            poller,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Stages this profile needs, before anything runs.
    pub fn plan(&self) -> StageGraph {
        StageGraph::for_profile(&self.profile, self.options.existing_network.is_some())
    }

    /// Name for a new cluster: explicit name first, then a generated one.
    pub fn cluster_name(&self) -> String {
        if !self.profile.cluster_name.is_empty() {
            return self.profile.cluster_name.clone();
        }
        let prefix = self
            .options
            .overrides
            .cluster_name_prefix
            .as_deref()
            .unwrap_or(defaults::CLUSTER_NAME_PREFIX);
        generate_cluster_name(
            &self.profile.name,
            prefix,
            self.options.overrides.cluster_name_suffix.as_deref(),
        )
    }

    fn domain_prefix(&self, cluster_name: &str) -> Option<String> {
        if !self.profile.domain_prefix.is_empty() {
            return Some(self.profile.domain_prefix.clone());
        }
        // Long names overflow the shared hosted zone's record limit.
        (self.profile.shared_vpc && cluster_name.len() > defaults::MAX_AUTO_DOMAIN_NAME_LEN)
            .then(|| random_name("shared-vpc", 4))
    }

    async fn identity(&self) -> ForgeResult<ClusterIdentity> {
        let openshift_version = resolve_version(self.manager.as_ref(), &self.profile).await?;
        let cluster_name = self.cluster_name();
        let domain_prefix = self.domain_prefix(&cluster_name);
        let admin_password = self
            .profile
            .admin_enabled
            .then(|| random_password(defaults::ADMIN_PASSWORD_LEN));

        Ok(ClusterIdentity {
            cluster_name,
            openshift_version,
            domain_prefix,
            admin_password,
            qe_usage: self.options.qe_usage.clone(),
        })
    }

    /// Create every stage and the cluster, then wait for readiness.
    pub async fn provision(&self) -> ForgeResult<ProvisionOutcome> {
        let order = self.plan().order()?;
        let identity = self.identity().await?;

        tracing::info!(
            profile = %self.profile.name,
            cluster = %identity.cluster_name,
            version = ?identity.openshift_version,
            stages = ?order,
            "provisioning cluster"
        );

        self.artifacts.write_cluster_name(&identity.cluster_name)?;
        if let Some(password) = &identity.admin_password {
            self.artifacts.write_admin_password(password)?;
        }

        let mut cluster = ClusterArgs::from_profile(&self.profile, &identity);
        if self.profile.byovpc
            && let Some(network) = &self.options.existing_network
        {
            tracing::info!(subnets = ?network.subnet_ids, "using existing network");
            cluster.fold_existing_network(network);
        }

        let mut teardown = TeardownCoordinator::new();
        let mut runner = StageRunner::new(
            &self.profile,
            &self.options,
            &self.services,
            &self.artifacts,
        );
        for kind in &order {
            if let Err(e) = runner.run(*kind, &mut cluster, &mut teardown).await {
                tracing::error!(stage = %kind, error = %e, "stage failed, unwinding");
                return Err(self.compensate(&teardown, e).await);
            }
        }
        cluster.apply_profile_network(&self.profile);

        let cluster_id = match self.submit_cluster(&cluster, &mut teardown).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "cluster creation failed, unwinding");
                return Err(self.compensate(&teardown, e).await);
            }
        };
        tracing::info!(cluster = %cluster.cluster_name, id = %cluster_id, "cluster created");

        let waited = !self.profile.dont_wait_for_cluster;
        if waited {
            self.poller
                .wait_cluster_ready(self.manager.as_ref(), &cluster_id)
                .await?;
        }

        Ok(ProvisionOutcome {
            cluster_name: cluster.cluster_name,
            cluster_id,
            version: identity.openshift_version,
            stages: order,
            waited,
        })
    }

    /// Apply the cluster request and read back its id.
    ///
    /// On failure the request is recorded and the cluster joins the
    /// teardown set, so whatever the engine created can still be destroyed.
    async fn submit_cluster(
        &self,
        args: &ClusterArgs,
        teardown: &mut TeardownCoordinator,
    ) -> ForgeResult<String> {
        let service = Arc::new(self.services.cluster());
        let submitted = match service.apply(args).await {
            Ok(_) => service.output().await,
            Err(e) => Err(e),
        };

        match submitted {
            Ok(out) if !out.cluster_id.is_empty() => Ok(out.cluster_id),
            Ok(_) => {
                teardown.push(service);
                Err(ForgeError::stage_output(CLUSTER_LABEL, "empty cluster id"))
            }
            Err(e) => {
                if let Err(record) = service.record_vars(args) {
                    tracing::warn!(error = %record, "failed to record cluster variables");
                }
                teardown.push(service);
                Err(e)
            }
        }
    }

    /// Unwind `teardown` after `cause`, returning the error to surface.
    async fn compensate(&self, teardown: &TeardownCoordinator, cause: ForgeError) -> ForgeError {
        if self.options.no_destroy {
            tracing::warn!(
                stages = ?teardown.destroy_order(),
                "cluster destroy disabled, leaving created stages in place"
            );
            return cause;
        }

        tracing::info!(order = ?teardown.destroy_order(), "tearing down created stages");
        match teardown.run().await {
            Ok(()) => cause,
            Err(failure) => ForgeError::Compensated {
                cause: Box::new(cause),
                teardown: Box::new(failure),
            },
        }
    }

    /// Destroy the cluster and every planned stage, newest first.
    ///
    /// Each destroy is attempted even when an earlier one failed. Stages
    /// that were never created are skipped.
    pub async fn decommission(&self) -> ForgeResult<()> {
        if self.options.no_destroy {
            tracing::warn!(profile = %self.profile.name, "cluster destroy disabled, skipping");
            return Ok(());
        }

        let mut failures = Vec::new();

        let cluster: Arc<dyn StageHandle> = Arc::new(self.services.cluster());
        failures.extend(sweep([&cluster]).await);

        if let Err(e) = self.ensure_cluster_gone().await {
            tracing::warn!(error = %e, "cluster still present after destroy");
            failures.push(TeardownFailure::new(CLUSTER_LABEL, e.to_string()));
        }

        let handles: Vec<Arc<dyn StageHandle>> = self
            .plan()
            .teardown_order()?
            .into_iter()
            .map(|kind| stage_handle(kind, &self.services))
            .collect();
        failures.extend(sweep(&handles).await);

        if failures.is_empty() {
            tracing::info!(profile = %self.profile.name, "decommission complete");
            Ok(())
        } else {
            Err(ForgeError::Teardown(failures))
        }
    }

    /// Delete the persisted cluster through the backend when the engine
    /// left it behind, then wait until it is gone.
    async fn ensure_cluster_gone(&self) -> ForgeResult<()> {
        let Some(name) = self.artifacts.read_cluster_name()? else {
            return Ok(());
        };

        let found = self
            .manager
            .list_clusters(&format!("name is '{name}'"))
            .await?;
        let Some(info) = found.into_iter().next() else {
            return Ok(());
        };

        tracing::info!(
            cluster = %name,
            id = %info.id,
            state = %info.state,
            "deleting leftover cluster"
        );
        match self.manager.delete_cluster(&info.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        }
        self.poller
            .wait_cluster_absent(self.manager.as_ref(), &info.id)
            .await
    }

    /// Id of the cluster this run manages.
    ///
    /// An explicit id in the options wins over the recorded engine output.
    pub async fn retrieve_cluster_id(&self) -> ForgeResult<String> {
        if let Some(id) = self.options.cluster_id.as_ref().filter(|id| !id.is_empty()) {
            return Ok(id.clone());
        }
        let out = self.services.cluster().output().await?;
        if out.cluster_id.is_empty() {
            return Err(ForgeError::NotFound(format!(
                "cluster id for profile {}",
                self.profile.name
            )));
        }
        Ok(out.cluster_id)
    }
}
