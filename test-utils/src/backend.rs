use async_trait::async_trait;
use clusterforge::backend::{ClusterInfo, ClusterManager, ClusterState, VersionInfo};
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct State {
    versions: Vec<VersionInfo>,
    clusters: BTreeMap<String, ClusterInfo>,
    /// States served, one per read, before the stored state applies.
    scripted: BTreeMap<String, Vec<ClusterState>>,
    deleted: Vec<String>,
    searches: Vec<String>,
}

/// In-memory backend.
///
/// Deleting a cluster removes it at once, so an absence poll finishes on
/// its next check.
#[derive(Default)]
pub struct FakeClusterManager {
    state: Mutex<State>,
}

pub fn version(raw: &str, upgrades: &[&str]) -> VersionInfo {
    VersionInfo {
        id: format!("openshift-v{raw}"),
        raw_id: raw.to_string(),
        channel_group: "stable".to_string(),
        enabled: true,
        rosa_enabled: true,
        hosted_control_plane_enabled: true,
        available_upgrades: upgrades.iter().map(|s| s.to_string()).collect(),
        end_of_life_timestamp: None,
    }
}

impl FakeClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with a small stable channel: 4.13.20 -> 4.14.8, 4.14.5 -> 4.14.8.
    pub fn with_default_versions() -> Self {
        let manager = Self::new();
        manager.set_versions(vec![
            version("4.13.20", &["4.14.8"]),
            version("4.14.5", &["4.14.8"]),
            version("4.14.8", &[]),
        ]);
        manager
    }

    pub fn set_versions(&self, versions: Vec<VersionInfo>) {
        self.state.lock().versions = versions;
    }

    pub fn add_cluster(&self, id: &str, name: &str, state: ClusterState) {
        self.state.lock().clusters.insert(
            id.to_string(),
            ClusterInfo {
                id: id.to_string(),
                name: name.to_string(),
                state,
            },
        );
    }

    /// Serve `states` on the next reads of `id`, then its stored state.
    pub fn script_states(&self, id: &str, states: Vec<ClusterState>) {
        self.state.lock().scripted.insert(id.to_string(), states);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().clusters.contains_key(id)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().searches.clone()
    }
}

/// Value of a `name is '<name>'` search.
fn searched_name(search: &str) -> Option<&str> {
    search
        .strip_prefix("name is '")
        .and_then(|rest| rest.strip_suffix('\''))
}

#[async_trait]
impl ClusterManager for FakeClusterManager {
    async fn list_versions(&self, search: &str) -> ForgeResult<Vec<VersionInfo>> {
        let mut state = self.state.lock();
        state.searches.push(search.to_string());
        Ok(state.versions.clone())
    }

    async fn get_cluster(&self, id: &str) -> ForgeResult<Option<ClusterInfo>> {
        let mut state = self.state.lock();
        let Some(mut info) = state.clusters.get(id).cloned() else {
            return Ok(None);
        };
        if let Some(queue) = state.scripted.get_mut(id)
            && !queue.is_empty()
        {
            info.state = queue.remove(0);
        }
        Ok(Some(info))
    }

    async fn list_clusters(&self, search: &str) -> ForgeResult<Vec<ClusterInfo>> {
        let mut state = self.state.lock();
        state.searches.push(search.to_string());
        let wanted = searched_name(search);
        Ok(state
            .clusters
            .values()
            .filter(|c| wanted.is_none_or(|name| c.name == name))
            .cloned()
            .collect())
    }

    async fn delete_cluster(&self, id: &str) -> ForgeResult<()> {
        let mut state = self.state.lock();
        if state.clusters.remove(id).is_none() {
            return Err(ForgeError::NotFound(format!("cluster {id}")));
        }
        state.deleted.push(id.to_string());
        Ok(())
    }
}
