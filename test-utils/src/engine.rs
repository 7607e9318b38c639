use async_trait::async_trait;
use clusterforge::engine::{EngineWorkspace, InfraEngine, OutputMap};
use clusterforge::runtime::constants::manifests;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Init,
    Apply,
    Output,
    Destroy,
}

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub op: EngineOp,
    /// Workspace scope, e.g. `rosa-sts-ad` or `rosa-sts-ad-dup`.
    pub scope: String,
    /// Manifest name, e.g. `vpc`.
    pub resource: String,
}

#[derive(Default)]
struct State {
    calls: Vec<EngineCall>,
    outputs: HashMap<String, Value>,
    failures: HashMap<(EngineOp, String), String>,
    vars: HashMap<String, Value>,
}

/// Engine double keyed by manifest name.
///
/// Outputs and failures can be scripted for a bare manifest (`kms`) or for
/// one scope (`rosa-hcp-dup/kms`); the scoped entry wins.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

fn locate(workspace: &EngineWorkspace) -> (String, String) {
    let dir = workspace.work_dir();
    let name = |p: Option<&Path>| {
        p.and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    (name(dir.parent()), name(Some(dir)))
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose every manifest produces a plausible output.
    pub fn with_default_outputs() -> Self {
        let engine = Self::new();
        for (resource, value) in default_outputs() {
            engine.set_output(resource, value);
        }
        engine
    }

    pub fn set_output(&self, resource: &str, value: Value) {
        self.state.lock().outputs.insert(resource.to_string(), value);
    }

    /// Make `op` on `resource` fail with `message` until cleared.
    pub fn fail(&self, op: EngineOp, resource: &str, message: &str) {
        self.state
            .lock()
            .failures
            .insert((op, resource.to_string()), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    /// Manifests that saw `op`, in call order.
    pub fn resources(&self, op: EngineOp) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.resource.clone())
            .collect()
    }

    pub fn applied(&self) -> Vec<String> {
        self.resources(EngineOp::Apply)
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.resources(EngineOp::Destroy)
    }

    pub fn count(&self, op: EngineOp, resource: &str) -> usize {
        self.resources(op).iter().filter(|r| *r == resource).count()
    }

    /// Variables of the last apply of `resource` (bare or `scope/resource`).
    pub fn last_vars(&self, resource: &str) -> Option<Value> {
        self.state.lock().vars.get(resource).cloned()
    }

    fn record(&self, op: EngineOp, workspace: &EngineWorkspace) -> ForgeResult<(String, String)> {
        let (scope, resource) = locate(workspace);
        let mut state = self.state.lock();
        state.calls.push(EngineCall {
            op,
            scope: scope.clone(),
            resource: resource.clone(),
        });

        let scoped = format!("{scope}/{resource}");
        let failure = state
            .failures
            .get(&(op, scoped))
            .or_else(|| state.failures.get(&(op, resource.clone())));
        match failure {
            Some(message) => Err(ForgeError::Engine(message.clone())),
            None => Ok((scope, resource)),
        }
    }
}

#[async_trait]
impl InfraEngine for FakeEngine {
    async fn init(&self, workspace: &EngineWorkspace) -> ForgeResult<()> {
        workspace.dir().prepare()?;
        self.record(EngineOp::Init, workspace).map(|_| ())
    }

    async fn apply(&self, workspace: &EngineWorkspace, vars_file: &Path) -> ForgeResult<String> {
        let (scope, resource) = self.record(EngineOp::Apply, workspace)?;
        let raw = std::fs::read_to_string(vars_file)?;
        let vars: Value = serde_json::from_str(&raw)?;

        let mut state = self.state.lock();
        state.vars.insert(format!("{scope}/{resource}"), vars.clone());
        state.vars.insert(resource, vars);
        Ok("Apply complete! Resources: 1 added, 0 changed, 0 destroyed.".to_string())
    }

    async fn output(&self, workspace: &EngineWorkspace) -> ForgeResult<OutputMap> {
        let (scope, resource) = self.record(EngineOp::Output, workspace)?;
        let state = self.state.lock();
        let value = state
            .outputs
            .get(&format!("{scope}/{resource}"))
            .or_else(|| state.outputs.get(&resource))
            .cloned()
            .unwrap_or_else(|| json!({}));
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ForgeError::Engine(format!(
                "scripted output for {resource} is not an object: {other}"
            ))),
        }
    }

    async fn destroy(&self, workspace: &EngineWorkspace, vars_file: &Path) -> ForgeResult<String> {
        if !vars_file.is_file() {
            return Err(ForgeError::Engine(format!(
                "destroy without variables file {}",
                vars_file.display()
            )));
        }
        self.record(EngineOp::Destroy, workspace)?;
        Ok("Destroy complete! Resources: 1 destroyed.".to_string())
    }
}

/// Outputs for every manifest, shaped like the real modules' outputs.
pub fn default_outputs() -> Vec<(&'static str, Value)> {
    vec![
        (
            manifests::ACCOUNT_ROLES,
            json!({
                "account_role_prefix": "rhcs-acc",
                "aws_account_id": "123456789012",
                "installer_role_arn": "arn:aws:iam::123456789012:role/rhcs-acc-Installer-Role"
            }),
        ),
        (
            manifests::OPERATOR_ROLES,
            json!({
                "oidc_config_id": "oidc-123",
                "account_role_prefix": "rhcs-acc",
                "operator_role_prefix": "rhcs-op",
                "ingress_operator_role_arn": "arn:aws:iam::123456789012:role/rhcs-op-ingress"
            }),
        ),
        (
            manifests::VPC,
            json!({
                "vpc_id": "vpc-0abc",
                "vpc_cidr": "10.0.0.0/16",
                "private_subnets": ["subnet-priv-a", "subnet-priv-b", "subnet-priv-c"],
                "public_subnets": ["subnet-pub-a", "subnet-pub-b", "subnet-pub-c"],
                "availability_zones": ["us-west-2a", "us-west-2b", "us-west-2c"]
            }),
        ),
        (manifests::DNS, json!({ "dns_domain_id": "dns-xyz.example.com" })),
        (
            manifests::SHARED_VPC,
            json!({
                "shared_role": "arn:aws:iam::641733028092:role/shared-vpc-role",
                "hosted_zone_id": "Z0123",
                "azs": ["usw2-az1", "usw2-az2", "usw2-az3"]
            }),
        ),
        (
            manifests::SECURITY_GROUPS,
            json!({ "sg_ids": ["sg-0", "sg-1", "sg-2", "sg-3", "sg-4", "sg-5", "sg-6", "sg-7"] }),
        ),
        (
            manifests::PROXY,
            json!({
                "proxies": [{
                    "http_proxy": "http://10.0.0.10:8080",
                    "https_proxy": "https://10.0.0.10:8443",
                    "no_proxy": "quay.io",
                    "additional_trust_bundle": "-----BEGIN CERTIFICATE-----"
                }]
            }),
        ),
        (manifests::KMS, json!({ "arn": "arn:aws:kms:us-west-2:123456789012:key/primary" })),
        (manifests::CLUSTERS, json!({ "cluster_id": "2a3b4c" })),
    ]
}
