//! Integration tests for provisioning runs against the fake engine and backend.

use clusterforge::backend::ClusterState;
use clusterforge::runtime::constants::manifests;
use clusterforge::runtime::options::ExistingNetwork;
use clusterforge::{ForgeError, StageKind};
use clusterforge_test_utils::profiles::{
    HCP_DIFFERENT_KEYS, HCP_SHARED_VPC, STS, STS_BYOVPC_PROXY, STS_BYOVPC_SG_KMS, STS_UPGRADE_Y,
};
use clusterforge_test_utils::{EngineOp, TestEnv};
use serde_json::json;
use std::time::Duration;

const CLUSTER_ID: &str = "2a3b4c";

/// Env whose cluster comes up ready on the first check.
fn ready_env() -> TestEnv {
    let env = TestEnv::new();
    env.manager.add_cluster(CLUSTER_ID, "any", ClusterState::Ready);
    env
}

// ============================================================================
// STAGE ORDER
// ============================================================================

#[tokio::test]
async fn sts_byovpc_proxy_runs_stages_in_dependency_order() {
    let env = ready_env();
    let outcome = env.provisioner().provision(STS_BYOVPC_PROXY).await.unwrap();

    assert_eq!(
        outcome.stages,
        vec![
            StageKind::AccountRoles,
            StageKind::OperatorRoles,
            StageKind::Vpc,
            StageKind::Proxy
        ]
    );
    assert_eq!(
        env.engine.applied(),
        vec![
            manifests::ACCOUNT_ROLES,
            manifests::OPERATOR_ROLES,
            manifests::VPC,
            manifests::PROXY,
            manifests::CLUSTERS,
        ]
    );
    assert_eq!(outcome.cluster_id, CLUSTER_ID);
    assert_eq!(outcome.version.as_deref(), Some("4.14.5"));
    assert!(outcome.waited);
}

#[tokio::test]
async fn stage_outputs_feed_the_cluster_request() {
    let env = ready_env();
    env.provisioner().provision(STS_BYOVPC_PROXY).await.unwrap();

    let proxy = env.engine.last_vars(manifests::PROXY).unwrap();
    assert_eq!(proxy["subnet_public_id"], "subnet-pub-a");
    assert_eq!(proxy["vpc_id"], "vpc-0abc");
    assert!(proxy["trust_bundle_path"].as_str().unwrap().ends_with("ca.cert"));

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(cluster["aws_region"], "us-west-2");
    assert_eq!(cluster["account_role_prefix"], "rhcs-acc");
    assert_eq!(cluster["operator_role_prefix"], "rhcs-op");
    assert_eq!(cluster["oidc_config_id"], "oidc-123");
    assert_eq!(cluster["machine_cidr"], "10.0.0.0/16");
    assert_eq!(cluster["proxy"]["http_proxy"], "http://10.0.0.10:8080");
    assert_eq!(cluster["aws_subnet_ids"].as_array().unwrap().len(), 6);
    assert_eq!(cluster["custom_properties"]["qe_usage"], "");
}

#[tokio::test]
async fn security_groups_and_key_are_folded() {
    let env = ready_env();
    let outcome = env.provisioner().provision(STS_BYOVPC_SG_KMS).await.unwrap();

    assert_eq!(
        outcome.stages,
        vec![
            StageKind::AccountRoles,
            StageKind::OperatorRoles,
            StageKind::Vpc,
            StageKind::SecurityGroups,
            StageKind::Kms
        ]
    );

    let sg = env.engine.last_vars(manifests::SECURITY_GROUPS).unwrap();
    assert_eq!(sg["sg_number"], 8);
    assert_eq!(sg["name_prefix"], "rhcs-ci");

    let vpc = env.engine.last_vars(manifests::VPC).unwrap();
    assert_eq!(
        vpc["availability_zones"],
        json!(["us-west-2a", "us-west-2b", "us-west-2c"])
    );

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(
        cluster["additional_compute_security_groups"],
        json!(["sg-0", "sg-1", "sg-2"])
    );
    assert_eq!(
        cluster["kms_key_arn"],
        "arn:aws:kms:us-west-2:123456789012:key/primary"
    );
    assert!(cluster.get("etcd_kms_key_arn").is_none());
}

// ============================================================================
// IDENTITY AND ARTIFACTS
// ============================================================================

#[tokio::test]
async fn generated_cluster_name_is_persisted() {
    let env = ready_env();
    let outcome = env.provisioner().provision(STS).await.unwrap();

    assert!(outcome.cluster_name.starts_with("rhcs-sts-ad-"), "{}", outcome.cluster_name);
    let persisted = std::fs::read_to_string(env.output_dir().join("cluster-name")).unwrap();
    assert_eq!(persisted.trim(), outcome.cluster_name);

    let password = std::fs::read_to_string(env.output_dir().join("cluster-admin-user")).unwrap();
    assert_eq!(password.trim().len(), 14);
    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(cluster["admin_credentials"]["password"], password.trim());
}

#[tokio::test]
async fn cluster_name_override_wins() {
    let env = ready_env();
    let mut options = env.options();
    options.overrides.cluster_name = Some("qe-fixed".to_string());

    let outcome = env.provisioner_with(options).provision(STS).await.unwrap();
    assert_eq!(outcome.cluster_name, "qe-fixed");

    let roles = env.engine.last_vars(manifests::ACCOUNT_ROLES).unwrap();
    assert_eq!(roles["account_role_prefix"], "qe-fixed");
    assert_eq!(roles["openshift_version"], "4.14");
    assert_eq!(roles["channel_group"], "stable");
    assert!(roles.get("shared_vpc_role_arn").is_none());

    let operator = env.engine.last_vars(manifests::OPERATOR_ROLES).unwrap();
    assert_eq!(operator["operator_role_prefix"], "qe-fixed");
    assert_eq!(operator["account_role_prefix"], "rhcs-acc");
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

#[tokio::test]
async fn repeating_a_run_applies_nothing_twice() {
    let env = ready_env();
    let mut options = env.options();
    options.overrides.cluster_name = Some("qe-repeat".to_string());
    let provisioner = env.provisioner_with(options);

    let first = provisioner.provision(STS_BYOVPC_PROXY).await.unwrap();
    let second = provisioner.provision(STS_BYOVPC_PROXY).await.unwrap();

    assert_eq!(first, second);
    for resource in [
        manifests::ACCOUNT_ROLES,
        manifests::OPERATOR_ROLES,
        manifests::VPC,
        manifests::PROXY,
        manifests::CLUSTERS,
    ] {
        assert_eq!(env.engine.count(EngineOp::Apply, resource), 1, "{resource}");
    }
}

// ============================================================================
// NETWORK VARIANTS
// ============================================================================

#[tokio::test]
async fn existing_network_skips_network_stages() {
    let env = ready_env();
    let mut options = env.options();
    options.existing_network = Some(ExistingNetwork {
        subnet_ids: vec!["subnet-1".into(), "subnet-2".into()],
        availability_zones: vec!["us-west-2a".into()],
    });

    let outcome = env
        .provisioner_with(options)
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap();

    assert_eq!(
        outcome.stages,
        vec![StageKind::AccountRoles, StageKind::OperatorRoles]
    );
    assert_eq!(env.engine.count(EngineOp::Apply, manifests::VPC), 0);

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(cluster["aws_subnet_ids"], json!(["subnet-1", "subnet-2"]));
    assert_eq!(cluster["aws_availability_zones"], json!(["us-west-2a"]));
}

#[tokio::test]
async fn shared_vpc_wires_dns_domain_and_policy() {
    let env = ready_env();
    let creds = env.path().join("shared-credentials");
    std::fs::write(&creds, "[default]\n").unwrap();
    let mut options = env.options();
    options.shared_vpc_credentials_file = Some(creds.clone());

    let outcome = env
        .provisioner_with(options)
        .provision(HCP_SHARED_VPC)
        .await
        .unwrap();

    assert_eq!(
        outcome.stages,
        vec![
            StageKind::AccountRoles,
            StageKind::OperatorRoles,
            StageKind::Vpc,
            StageKind::DnsDomain,
            StageKind::SharedVpcPolicy
        ]
    );

    let roles = env.engine.last_vars(manifests::ACCOUNT_ROLES).unwrap();
    assert_eq!(
        roles["shared_vpc_role_arn"],
        format!(
            "arn:aws:iam::641733028092:role/{}-shared-vpc-role",
            outcome.cluster_name
        )
    );

    let vpc = env.engine.last_vars(manifests::VPC).unwrap();
    assert_eq!(
        vpc["aws_shared_credentials_files"],
        json!([creds.display().to_string()])
    );

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    let policy = env.engine.last_vars(manifests::SHARED_VPC).unwrap();
    assert_eq!(policy["subnets"], cluster["aws_subnet_ids"]);
    assert_eq!(policy["dns_domain_id"], "dns-xyz.example.com");
    assert_eq!(
        policy["installer_role_arn"],
        "arn:aws:iam::123456789012:role/rhcs-acc-Installer-Role"
    );

    assert_eq!(cluster["base_dns_domain"], "dns-xyz.example.com");
    assert_eq!(cluster["private_hosted_zone"]["id"], "Z0123");
    assert_eq!(
        cluster["aws_availability_zones"],
        json!(["usw2-az1", "usw2-az2", "usw2-az3"])
    );
    // Generated names of this profile are always longer than 15 characters.
    assert!(
        cluster["domain_prefix"].as_str().unwrap().starts_with("shared-vpc-"),
        "{cluster}"
    );
}

// ============================================================================
// ENCRYPTION KEYS
// ============================================================================

#[tokio::test]
async fn separate_etcd_key_lives_in_duplicate_scope() {
    let env = ready_env();
    env.engine.set_output(
        &format!("{HCP_DIFFERENT_KEYS}-dup/kms"),
        json!({ "arn": "arn:aws:kms:us-east-2:123456789012:key/etcd" }),
    );

    let outcome = env.provisioner().provision(HCP_DIFFERENT_KEYS).await.unwrap();
    assert_eq!(&outcome.stages[3..], &[StageKind::Kms, StageKind::EtcdKms]);

    let dup_applies: Vec<_> = env
        .engine
        .calls()
        .into_iter()
        .filter(|c| c.op == EngineOp::Apply && c.resource == manifests::KMS)
        .map(|c| c.scope)
        .collect();
    assert_eq!(
        dup_applies,
        vec![
            HCP_DIFFERENT_KEYS.to_string(),
            format!("{HCP_DIFFERENT_KEYS}-dup")
        ]
    );

    let etcd_key = env
        .engine
        .last_vars(&format!("{HCP_DIFFERENT_KEYS}-dup/kms"))
        .unwrap();
    assert_eq!(etcd_key["kms_name"], format!("{}-2", outcome.cluster_name));
    assert_eq!(etcd_key["hcp"], true);

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(
        cluster["kms_key_arn"],
        "arn:aws:kms:us-west-2:123456789012:key/primary"
    );
    assert_eq!(
        cluster["etcd_kms_key_arn"],
        "arn:aws:kms:us-east-2:123456789012:key/etcd"
    );
    assert_eq!(cluster["etcd_encryption"], true);
}

// ============================================================================
// VERSIONS AND READINESS
// ============================================================================

#[tokio::test]
async fn no_wait_profile_skips_readiness_and_resolves_y_stream() {
    // No cluster registered in the backend: any readiness check would fail.
    let env = TestEnv::new();
    let outcome = env.provisioner().provision(STS_UPGRADE_Y).await.unwrap();

    assert!(!outcome.waited);
    assert_eq!(outcome.version.as_deref(), Some("4.13.20"));
    assert!(
        env.manager
            .searches()
            .iter()
            .any(|s| s.contains("available_upgrades != ''"))
    );

    let cluster = env.engine.last_vars(manifests::CLUSTERS).unwrap();
    assert_eq!(cluster["wait_for_cluster"], false);
}

#[tokio::test]
async fn readiness_timeout_leaves_everything_in_place() {
    let env = TestEnv::new();
    env.manager
        .add_cluster(CLUSTER_ID, "any", ClusterState::Installing);
    let mut options = env.options();
    options.poll.timeout = Duration::from_millis(50);

    let err = env
        .provisioner_with(options)
        .provision(STS_BYOVPC_PROXY)
        .await
        .unwrap_err();

    assert!(err.is_readiness_timeout(), "{err:?}");
    assert!(env.engine.destroyed().is_empty());
}

#[tokio::test]
async fn cluster_becomes_ready_after_installing() {
    let env = ready_env();
    env.manager.script_states(
        CLUSTER_ID,
        vec![ClusterState::Waiting, ClusterState::Installing],
    );

    let outcome = env.provisioner().provision(STS).await.unwrap();
    assert!(outcome.waited);
}

#[tokio::test]
async fn cluster_error_state_fails_the_wait() {
    let env = TestEnv::new();
    env.manager.add_cluster(CLUSTER_ID, "any", ClusterState::Error);

    let err = env.provisioner().provision(STS).await.unwrap_err();
    assert!(matches!(err, ForgeError::Backend(_)), "{err:?}");
    assert!(env.engine.destroyed().is_empty());
}
