//! Stage graph.
//!
//! ```text
//! identity-role ──► operator-role ─────────┐
//!    │                                     ▼
//!    │            dns-domain ──────► shared-network-policy
//!    │                                     ▲
//!    ├──────────► network ─────────────────┤
//!    │              ├──► security-groups   │
//!    │              ├──► egress-proxy      │
//!    ▼              ▼                      │
//! encryption-key, etcd-encryption-key      │
//!                                          ▼
//!                    (every stage) ──► cluster
//! ```
//!
//! Only stages present in a plan are constrained by these edges. The order
//! is a topological sort with ties broken by declaration order, which keeps
//! plans stable across runs.

use crate::profile::Profile;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One prerequisite stage. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    AccountRoles,
    OperatorRoles,
    Vpc,
    DnsDomain,
    SharedVpcPolicy,
    SecurityGroups,
    Proxy,
    Kms,
    /// Second key, in the duplicate scope, used for etcd only.
    EtcdKms,
}

impl StageKind {
    pub const ALL: [StageKind; 9] = [
        StageKind::AccountRoles,
        StageKind::OperatorRoles,
        StageKind::Vpc,
        StageKind::DnsDomain,
        StageKind::SharedVpcPolicy,
        StageKind::SecurityGroups,
        StageKind::Proxy,
        StageKind::Kms,
        StageKind::EtcdKms,
    ];

    /// Label used in logs, errors and the teardown report.
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::AccountRoles => "identity-role",
            StageKind::OperatorRoles => "operator-role",
            StageKind::Vpc => "network",
            StageKind::DnsDomain => "dns-domain",
            StageKind::SharedVpcPolicy => "shared-network-policy",
            StageKind::SecurityGroups => "security-groups",
            StageKind::Proxy => "egress-proxy",
            StageKind::Kms => "encryption-key",
            StageKind::EtcdKms => "etcd-encryption-key",
        }
    }

    /// Direct upstream stages, whether or not they are planned.
    pub fn upstream(&self) -> &'static [StageKind] {
        use StageKind::*;
        match self {
            AccountRoles | Vpc | DnsDomain => &[],
            OperatorRoles => &[AccountRoles],
            SharedVpcPolicy => &[Vpc, AccountRoles, OperatorRoles, DnsDomain],
            SecurityGroups | Proxy => &[Vpc],
            Kms | EtcdKms => &[AccountRoles, Vpc],
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for StageKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| ForgeError::InvalidArgument(format!("unknown stage '{s}'")))
    }
}

/// The stages one profile needs, with their dependency edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageGraph {
    stages: Vec<StageKind>,
}

impl StageGraph {
    /// Graph over an explicit stage set. Duplicates are ignored.
    pub fn from_stages(stages: impl IntoIterator<Item = StageKind>) -> Self {
        let mut present: Vec<StageKind> = Vec::new();
        for stage in stages {
            if !present.contains(&stage) {
                present.push(stage);
            }
        }
        present.sort();
        Self { stages: present }
    }

    /// Stages implied by a profile.
    ///
    /// `existing_network` means subnets were supplied from outside, so no
    /// network stage is planned even for a BYO-VPC profile.
    pub fn for_profile(profile: &Profile, existing_network: bool) -> Self {
        let mut stages = Vec::new();
        if profile.sts {
            stages.extend([StageKind::AccountRoles, StageKind::OperatorRoles]);
        }
        if profile.byovpc && !existing_network {
            stages.push(StageKind::Vpc);
            if profile.shared_vpc {
                stages.extend([StageKind::DnsDomain, StageKind::SharedVpcPolicy]);
            }
            if profile.additional_sg_number > 0 {
                stages.push(StageKind::SecurityGroups);
            }
            if profile.proxy {
                stages.push(StageKind::Proxy);
            }
        }
        if profile.needs_kms() {
            stages.push(StageKind::Kms);
        }
        if profile.needs_etcd_kms() {
            stages.push(StageKind::EtcdKms);
        }
        Self::from_stages(stages)
    }

    pub fn contains(&self, stage: StageKind) -> bool {
        self.stages.contains(&stage)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Planned stages in declaration order (not execution order).
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// Planned upstream stages of `stage`.
    pub fn dependencies(&self, stage: StageKind) -> Vec<StageKind> {
        stage
            .upstream()
            .iter()
            .copied()
            .filter(|up| self.contains(*up))
            .collect()
    }

    /// Edges between planned stages, as `(upstream, downstream)`.
    pub fn edges(&self) -> Vec<(StageKind, StageKind)> {
        self.stages
            .iter()
            .flat_map(|down| {
                self.dependencies(*down)
                    .into_iter()
                    .map(move |up| (up, *down))
            })
            .collect()
    }

    /// Creation order.
    pub fn order(&self) -> ForgeResult<Vec<StageKind>> {
        let mut remaining: Vec<(StageKind, Vec<StageKind>)> = self
            .stages
            .iter()
            .map(|s| (*s, self.dependencies(*s)))
            .collect();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            // `remaining` stays in declaration order, so the first ready stage wins ties.
            let Some(position) = remaining.iter().position(|(_, deps)| deps.is_empty()) else {
                let stuck: Vec<String> = remaining.iter().map(|(s, _)| s.to_string()).collect();
                return Err(ForgeError::Internal(format!(
                    "stage graph has a cycle among {}",
                    stuck.join(", ")
                )));
            };
            let (next, _) = remaining.remove(position);
            for (_, deps) in remaining.iter_mut() {
                deps.retain(|d| *d != next);
            }
            ordered.push(next);
        }
        Ok(ordered)
    }

    /// Destroy order: creation order reversed, so every edge is inverted.
    pub fn teardown_order(&self) -> ForgeResult<Vec<StageKind>> {
        let mut order = self.order()?;
        order.reverse();
        Ok(order)
    }
}
