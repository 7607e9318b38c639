//! Cloud-management backend.
//!
//! The orchestrator only needs a narrow slice of the backend: version
//! discovery for [`crate::versions`], and cluster lookup and deletion for
//! readiness polling and the decommission double-check.

#[cfg(feature = "rest")]
mod rest;

#[cfg(feature = "rest")]
pub use rest::RestClusterManager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clusterforge_shared::errors::ForgeResult;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One release as listed by the versions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    /// Backend id, e.g. `openshift-v4.14.3-candidate`.
    pub id: String,
    /// Bare semver, e.g. `4.14.3`.
    pub raw_id: String,
    pub channel_group: String,
    pub enabled: bool,
    pub rosa_enabled: bool,
    pub hosted_control_plane_enabled: bool,
    pub available_upgrades: Vec<String>,
    pub end_of_life_timestamp: Option<DateTime<Utc>>,
}

/// Lifecycle state reported for a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterState {
    Validating,
    Waiting,
    Pending,
    Installing,
    Ready,
    Error,
    Uninstalling,
    Hibernating,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::Validating => "validating",
            ClusterState::Waiting => "waiting",
            ClusterState::Pending => "pending",
            ClusterState::Installing => "installing",
            ClusterState::Ready => "ready",
            ClusterState::Error => "error",
            ClusterState::Uninstalling => "uninstalling",
            ClusterState::Hibernating => "hibernating",
            ClusterState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterInfo {
    pub id: String,
    pub name: String,
    pub state: ClusterState,
}

/// Backend operations used by the orchestrator.
///
/// Search strings use the backend's filter syntax
/// (`enabled='t' and channel_group='stable'`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// All versions matching `search`.
    async fn list_versions(&self, search: &str) -> ForgeResult<Vec<VersionInfo>>;

    /// Cluster by id; `None` when the backend does not know it.
    async fn get_cluster(&self, id: &str) -> ForgeResult<Option<ClusterInfo>>;

    async fn list_clusters(&self, search: &str) -> ForgeResult<Vec<ClusterInfo>>;

    /// Request deletion. Fails with `NotFound` when the cluster is already gone.
    async fn delete_cluster(&self, id: &str) -> ForgeResult<()>;
}
