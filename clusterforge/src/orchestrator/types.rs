use super::plan::StageKind;
use serde::Serialize;

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub cluster_name: String,
    pub cluster_id: String,
    /// Pinned version, `None` when the backend default applied.
    pub version: Option<String>,
    /// Stages run, in execution order.
    pub stages: Vec<StageKind>,
    /// Whether the run waited for the cluster to become ready.
    pub waited: bool,
}
