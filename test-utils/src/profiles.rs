//! Profile fixtures.

use clusterforge::profile::{Profile, ProfileCatalog};
use clusterforge::runtime::options::ProfileOverrides;
use std::path::{Path, PathBuf};

/// Classic STS cluster, no network stages.
pub const STS: &str = "rosa-sts-ad";
/// STS + BYO network + proxy in us-west-2.
pub const STS_BYOVPC_PROXY: &str = "rosa-sts-byovpc-proxy";
/// STS + BYO network + extra security groups + KMS.
pub const STS_BYOVPC_SG_KMS: &str = "rosa-sts-byovpc-sg-kms";
/// HCP + shared VPC.
pub const HCP_SHARED_VPC: &str = "rosa-hcp-shared-vpc";
/// HCP with separate etcd and volume keys.
pub const HCP_DIFFERENT_KEYS: &str = "rosa-hcp-kms-keys";
/// Non-STS BYO network.
pub const CLASSIC_BYOVPC: &str = "rosa-classic-byovpc";
/// STS, no readiness wait, version pinned through `y-1`.
pub const STS_UPGRADE_Y: &str = "rosa-sts-up-y";

pub const CATALOG: &str = r#"
profiles:
  - as: rosa-sts-ad
    cluster:
      cluster_type: rosa-classic
      sts: true
      multi_az: true
      version: 4.14.5
      admin_enabled: true
  - as: rosa-sts-byovpc-proxy
    cluster:
      cluster_type: rosa-classic
      sts: true
      byovpc: true
      proxy: true
      region: us-west-2
      version: 4.14.5
  - as: rosa-sts-byovpc-sg-kms
    cluster:
      cluster_type: rosa-classic
      sts: true
      byovpc: true
      multi_az: true
      zones: us-west-2a,us-west-2b,us-west-2c
      additional_sg_number: 3
      kms_key_arn: true
      region: us-west-2
      version: 4.14.5
  - as: rosa-hcp-shared-vpc
    need_specific_config: true
    cluster:
      cluster_type: rosa-hcp
      sts: true
      byovpc: true
      shared_vpc: true
      version: 4.14.8
  - as: rosa-hcp-kms-keys
    cluster:
      cluster_type: rosa-hcp
      sts: true
      byovpc: true
      kms_key_arn: true
      etcd_encryption: true
      different_encryption_keys: true
      version: 4.14.8
  - as: rosa-classic-byovpc
    cluster:
      cluster_type: rosa-classic
      byovpc: true
      version: 4.14.5
  - as: rosa-sts-up-y
    cluster:
      cluster_type: rosa-classic
      sts: true
      version_pattern: y-1
      no_wait_cluster: true
"#;

pub fn catalog() -> ProfileCatalog {
    ProfileCatalog::from_yaml(CATALOG).expect("fixture catalog parses")
}

/// Fixture profile with defaults applied and no overrides.
pub fn profile(name: &str) -> Profile {
    catalog()
        .get(name, &ProfileOverrides::default())
        .expect("fixture profile exists")
}

/// Write the fixture catalog into `dir` and return its path.
pub fn write_catalog(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create profiles dir");
    let path = dir.join("fixtures.yaml");
    std::fs::write(&path, CATALOG).expect("write catalog");
    path
}
