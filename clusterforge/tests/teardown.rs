//! Integration tests for failure compensation and decommission.

use clusterforge::backend::ClusterState;
use clusterforge::runtime::constants::manifests;
use clusterforge::ForgeError;
use clusterforge_test_utils::profiles::{HCP_SHARED_VPC, STS, STS_BYOVPC_PROXY};
use clusterforge_test_utils::{EngineOp, TestEnv};

const CLUSTER_ID: &str = "2a3b4c";

fn labels(err: &ForgeError) -> Vec<String> {
    err.teardown_failures()
        .iter()
        .map(|f| f.stage.clone())
        .collect()
}

// ============================================================================
// COMPENSATION
// ============================================================================

#[tokio::test]
async fn proxy_failure_unwinds_in_reverse() {
    let env = TestEnv::new();
    env.engine
        .fail(EngineOp::Apply, manifests::PROXY, "Error: no capacity for proxy");

    let err = env
        .provisioner()
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap_err();

    match &err {
        ForgeError::StageApply { stage, message } => {
            assert_eq!(stage, "egress-proxy");
            assert!(message.contains("no capacity"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        env.engine.destroyed(),
        vec![
            manifests::VPC,
            manifests::OPERATOR_ROLES,
            manifests::ACCOUNT_ROLES
        ]
    );
    assert_eq!(env.engine.count(EngineOp::Apply, manifests::CLUSTERS), 0);
}

#[tokio::test]
async fn unwinding_continues_past_a_failed_destroy() {
    let env = TestEnv::new();
    env.engine
        .fail(EngineOp::Apply, manifests::PROXY, "Error: no capacity for proxy");
    env.engine.fail(
        EngineOp::Destroy,
        manifests::OPERATOR_ROLES,
        "Error: role in use",
    );

    let err = env
        .provisioner()
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap_err();

    let ForgeError::Compensated { cause, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(matches!(**cause, ForgeError::StageApply { .. }));
    assert_eq!(labels(&err), vec!["operator-role"]);
    // The identity roles were still destroyed after the failure.
    assert_eq!(
        env.engine.destroyed().last().map(String::as_str),
        Some(manifests::ACCOUNT_ROLES)
    );
}

#[tokio::test]
async fn output_failure_still_destroys_the_stage() {
    let env = TestEnv::new();
    env.engine
        .fail(EngineOp::Output, manifests::VPC, "Error: state lock held");

    let err = env
        .provisioner()
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, ForgeError::StageOutput { stage, .. } if stage == "network"),
        "{err:?}"
    );
    assert_eq!(
        env.engine.destroyed(),
        vec![
            manifests::VPC,
            manifests::OPERATOR_ROLES,
            manifests::ACCOUNT_ROLES
        ]
    );
}

#[tokio::test]
async fn cluster_failure_records_request_and_unwinds() {
    let env = TestEnv::new();
    env.engine
        .fail(EngineOp::Apply, manifests::CLUSTERS, "Error: quota exceeded");

    let err = env.provisioner().provision(STS).await.unwrap_err();

    assert!(
        matches!(&err, ForgeError::StageApply { stage, .. } if stage == "cluster"),
        "{err:?}"
    );
    assert_eq!(
        env.engine.destroyed(),
        vec![
            manifests::CLUSTERS,
            manifests::OPERATOR_ROLES,
            manifests::ACCOUNT_ROLES
        ]
    );
}

#[tokio::test]
async fn missing_shared_vpc_credentials_unwind_roles() {
    let env = TestEnv::new();

    let err = env.provisioner().provision(HCP_SHARED_VPC).await.unwrap_err();

    assert!(matches!(err, ForgeError::Config(_)), "{err:?}");
    assert_eq!(env.engine.count(EngineOp::Apply, manifests::VPC), 0);
    assert_eq!(
        env.engine.destroyed(),
        vec![manifests::OPERATOR_ROLES, manifests::ACCOUNT_ROLES]
    );
}

#[tokio::test]
async fn no_destroy_keeps_created_stages() {
    let env = TestEnv::new();
    env.engine
        .fail(EngineOp::Apply, manifests::PROXY, "Error: no capacity for proxy");
    let mut options = env.options();
    options.no_destroy = true;

    let err = env
        .provisioner_with(options)
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::StageApply { .. }));
    assert!(env.engine.destroyed().is_empty());
}

#[tokio::test]
async fn failed_run_can_be_retried() {
    let env = TestEnv::new();
    env.manager.add_cluster(CLUSTER_ID, "any", ClusterState::Ready);
    env.engine
        .fail(EngineOp::Apply, manifests::PROXY, "Error: no capacity for proxy");
    let provisioner = env.provisioner();

    provisioner.provision(STS_BYOVPC_PROXY).await.unwrap_err();
    env.engine.clear_failures();
    let outcome = provisioner.provision(STS_BYOVPC_PROXY).await.unwrap();

    assert_eq!(outcome.cluster_id, CLUSTER_ID);
    assert_eq!(env.engine.count(EngineOp::Apply, manifests::VPC), 2);
}

// ============================================================================
// DECOMMISSION
// ============================================================================

/// Provision under a fixed name so the backend can list the cluster by it.
async fn provisioned(env: &TestEnv, name: &str) -> clusterforge::Provisioner {
    env.manager.add_cluster(CLUSTER_ID, name, ClusterState::Ready);
    let mut options = env.options();
    options.overrides.cluster_name = Some(name.to_string());
    let provisioner = env.provisioner_with(options);
    provisioner.provision(STS_BYOVPC_PROXY).await.unwrap();
    provisioner
}

#[tokio::test]
async fn decommission_destroys_cluster_then_stages() {
    let env = TestEnv::new();
    let provisioner = provisioned(&env, "qe-decom").await;

    provisioner.decommission(STS_BYOVPC_PROXY).await.unwrap();

    assert_eq!(
        env.engine.destroyed(),
        vec![
            manifests::CLUSTERS,
            manifests::PROXY,
            manifests::VPC,
            manifests::OPERATOR_ROLES,
            manifests::ACCOUNT_ROLES
        ]
    );
    assert_eq!(env.manager.deleted(), vec![CLUSTER_ID.to_string()]);
    assert!(!env.manager.contains(CLUSTER_ID));
    assert!(
        env.manager
            .searches()
            .contains(&"name is 'qe-decom'".to_string())
    );
}

#[tokio::test]
async fn decommission_joins_every_failure() {
    let env = TestEnv::new();
    let provisioner = provisioned(&env, "qe-decom-fail").await;
    env.engine
        .fail(EngineOp::Destroy, manifests::VPC, "Error: dependency violation");

    let err = provisioner.decommission(STS_BYOVPC_PROXY).await.unwrap_err();

    assert!(matches!(err, ForgeError::Teardown(_)), "{err:?}");
    assert_eq!(labels(&err), vec!["network"]);
    assert_eq!(
        env.engine.destroyed().last().map(String::as_str),
        Some(manifests::ACCOUNT_ROLES)
    );
}

#[tokio::test]
async fn decommission_of_unprovisioned_profile_is_a_noop() {
    let env = TestEnv::new();

    env.provisioner().decommission(STS_BYOVPC_PROXY).await.unwrap();

    assert!(env.engine.destroyed().is_empty());
    assert!(env.manager.deleted().is_empty());
}

#[tokio::test]
async fn decommission_respects_no_destroy() {
    let env = TestEnv::new();
    provisioned(&env, "qe-keep").await;
    let mut options = env.options();
    options.no_destroy = true;

    env.provisioner_with(options)
        .decommission(STS_BYOVPC_PROXY)
        .await
        .unwrap();

    assert!(env.engine.destroyed().is_empty());
    assert!(env.manager.contains(CLUSTER_ID));
}

// ============================================================================
// CLUSTER ID
// ============================================================================

#[tokio::test]
async fn cluster_id_prefers_explicit_option() {
    let env = TestEnv::new();
    let mut options = env.options();
    options.cluster_id = Some("explicit-id".to_string());

    let id = env
        .provisioner_with(options)
        .retrieve_cluster_id(STS)
        .await
        .unwrap();
    assert_eq!(id, "explicit-id");
}

#[tokio::test]
async fn cluster_id_comes_from_recorded_output() {
    let env = TestEnv::new();
    let provisioner = provisioned(&env, "qe-id").await;

    let id = provisioner.retrieve_cluster_id(STS_BYOVPC_PROXY).await.unwrap();
    assert_eq!(id, CLUSTER_ID);
}

#[tokio::test]
async fn cluster_id_before_any_run_is_invalid_state() {
    let env = TestEnv::new();
    let err = env.provisioner().retrieve_cluster_id(STS).await.unwrap_err();
    assert!(matches!(err, ForgeError::InvalidState(_)), "{err:?}");
}
