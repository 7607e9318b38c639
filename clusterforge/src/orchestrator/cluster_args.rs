//! Assembling the cluster request.
//!
//! The request starts from the profile and is then folded with each stage
//! output as the stage succeeds. A field fed by a stage stays unset until
//! that stage has produced its output.

use crate::profile::Profile;
use crate::runtime::constants::defaults;
use crate::runtime::options::ExistingNetwork;
use crate::services::{
    AccountRolesOutput, AdminCredentials, Autoscaling, ClusterArgs, OperatorRolesOutput,
    PrivateHostedZone, ProxyOutput, ProxySettings, SecurityGroupsOutput, SharedVpcPolicyOutput,
    VpcOutput,
};
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::collections::BTreeMap;

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Values decided before any stage runs.
#[derive(Debug, Clone, Default)]
pub struct ClusterIdentity {
    pub cluster_name: String,
    pub openshift_version: Option<String>,
    pub domain_prefix: Option<String>,
    pub admin_password: Option<String>,
    pub qe_usage: String,
}

impl ClusterArgs {
    /// Request fields that come straight from the profile.
    pub fn from_profile(profile: &Profile, identity: &ClusterIdentity) -> Self {
        let mut args = ClusterArgs {
            cluster_name: identity.cluster_name.clone(),
            openshift_version: identity.openshift_version.clone(),
            aws_region: if profile.region.is_empty() {
                defaults::REGION.to_string()
            } else {
                profile.region.clone()
            },
            multi_az: profile.multi_az,
            fips: profile.fips,
            domain_prefix: identity.domain_prefix.clone(),
            compute_machine_type: non_empty(&profile.compute_machine_type),
            channel_group: non_empty(&profile.channel_group),
            ec2_metadata_http_tokens: non_empty(&profile.ec2_metadata_http_tokens),
            unified_acc_roles_path: non_empty(&profile.unified_acc_roles_path),
            replicas: (profile.compute_replicas > 0).then_some(profile.compute_replicas),
            ..Default::default()
        };

        if profile.private {
            args.private = Some(true);
            args.private_link = Some(profile.private_link);
        }
        if profile.networking_set {
            args.machine_cidr = Some(defaults::VPC_CIDR.to_string());
        }
        if profile.autoscale {
            args.autoscaling = Some(Autoscaling {
                autoscaling_enabled: true,
                min_replicas: defaults::AUTOSCALING_MIN_REPLICAS,
                max_replicas: defaults::AUTOSCALING_MAX_REPLICAS,
            });
        }
        if profile.labeling {
            args.default_mp_labels = Some(string_map(&defaults::machine_pool_labels()));
        }
        if profile.tagging {
            args.tags = Some(string_map(&defaults::resource_tags()));
        }
        if let Some(password) = &identity.admin_password {
            args.admin_credentials = Some(AdminCredentials {
                username: defaults::ADMIN_USER.to_string(),
                password: password.clone(),
            });
        }

        args.custom_properties = Some(string_map(&[
            ("custom_property", "test"),
            ("qe_usage", identity.qe_usage.as_str()),
        ]));
        if profile.full_resources {
            args.full_resources = Some(true);
        }
        if profile.dont_wait_for_cluster {
            args.wait_for_cluster = Some(false);
        }
        if profile.use_registry_config {
            args.allowed_registries = Some(profile.allowed_registries.clone());
            args.blocked_registries = Some(profile.blocked_registries.clone());
        }
        args
    }

    pub fn fold_account_roles(&mut self, output: &AccountRolesOutput) {
        self.account_role_prefix = Some(output.account_role_prefix.clone());
    }

    pub fn fold_operator_roles(&mut self, output: &OperatorRolesOutput) {
        self.oidc_config_id = Some(output.oidc_config_id.clone());
        self.operator_role_prefix = Some(output.operator_role_prefix.clone());
    }

    /// Subnets, zones and machine CIDR of a created network.
    ///
    /// Private clusters only get subnets when they use private link, and
    /// then only the private ones. Zones are taken from the network unless
    /// a shared-VPC policy overrides them later.
    pub fn fold_vpc(&mut self, output: &VpcOutput, profile: &Profile) -> ForgeResult<()> {
        if output.private_subnets.is_empty() {
            return Err(ForgeError::stage_output(
                "network",
                "network reported no private subnets",
            ));
        }

        if profile.private {
            if profile.private_link {
                self.aws_subnet_ids = Some(output.private_subnets.clone());
            }
        } else {
            let mut subnets = output.private_subnets.clone();
            subnets.extend(output.public_subnets.iter().cloned());
            self.aws_subnet_ids = Some(subnets);
        }

        if !profile.shared_vpc {
            self.aws_availability_zones = Some(output.availability_zones.clone());
        }
        self.machine_cidr = Some(output.vpc_cidr.clone());
        Ok(())
    }

    pub fn fold_existing_network(&mut self, network: &ExistingNetwork) {
        self.aws_subnet_ids = Some(network.subnet_ids.clone());
        self.aws_availability_zones = Some(network.availability_zones.clone());
    }

    /// Zones as seen from the cluster account replace the network's zones.
    pub fn fold_shared_vpc(&mut self, dns_domain_id: &str, output: &SharedVpcPolicyOutput) {
        self.base_dns_domain = Some(dns_domain_id.to_string());
        self.private_hosted_zone = Some(PrivateHostedZone {
            id: output.hosted_zone_id.clone(),
            role_arn: output.shared_role.clone(),
        });
        self.aws_availability_zones = Some(output.azs.clone());
    }

    /// The first `count` groups go to every machine-pool slot; the rest are spares.
    pub fn fold_security_groups(
        &mut self,
        output: &SecurityGroupsOutput,
        count: u32,
    ) -> ForgeResult<()> {
        let count = count as usize;
        let Some(ids) = output.sg_ids.get(..count) else {
            return Err(ForgeError::stage_output(
                "security-groups",
                format!("expected at least {count} groups, got {}", output.sg_ids.len()),
            ));
        };
        self.additional_compute_security_groups = Some(ids.to_vec());
        self.additional_infra_security_groups = Some(ids.to_vec());
        self.additional_control_plane_security_groups = Some(ids.to_vec());
        Ok(())
    }

    pub fn fold_proxy(&mut self, output: &ProxyOutput) -> ForgeResult<()> {
        let Some(proxy) = output.proxies.first() else {
            return Err(ForgeError::stage_output("egress-proxy", "no proxy endpoint reported"));
        };
        self.proxy = Some(ProxySettings {
            http_proxy: proxy.http_proxy.clone(),
            https_proxy: proxy.https_proxy.clone(),
            no_proxy: proxy.no_proxy.clone(),
            additional_trust_bundle: proxy.additional_trust_bundle.clone(),
        });
        Ok(())
    }

    /// One key for both purposes until a dedicated etcd key replaces it.
    pub fn fold_kms(&mut self, key_arn: &str, profile: &Profile) {
        if profile.etcd {
            self.etcd_encryption = Some(true);
            self.etcd_kms_key_arn = Some(key_arn.to_string());
        }
        if profile.kms_key {
            self.kms_key_arn = Some(key_arn.to_string());
        }
    }

    pub fn fold_etcd_kms(&mut self, key_arn: &str) {
        self.etcd_kms_key_arn = Some(key_arn.to_string());
    }

    /// Explicit network settings in the profile win over stage outputs.
    pub fn apply_profile_network(&mut self, profile: &Profile) {
        if let Some(cidr) = non_empty(&profile.machine_cidr) {
            self.machine_cidr = Some(cidr);
        }
        if let Some(cidr) = non_empty(&profile.service_cidr) {
            self.service_cidr = Some(cidr);
        }
        if let Some(cidr) = non_empty(&profile.pod_cidr) {
            self.pod_cidr = Some(cidr);
        }
        if profile.host_prefix > 0 {
            self.host_prefix = Some(profile.host_prefix);
        }
        if profile.worker_disk_size > 0 {
            self.worker_disk_size = Some(profile.worker_disk_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProxyEndpoint;

    fn profile(yaml: &str) -> Profile {
        let mut profile: Profile = serde_yaml::from_str(yaml).unwrap();
        profile.name = "rosa-test".into();
        profile
    }

    fn identity() -> ClusterIdentity {
        ClusterIdentity {
            cluster_name: "rhcs-sts-ad-x7k".into(),
            openshift_version: Some("4.14.3".into()),
            qe_usage: "ci".into(),
            ..Default::default()
        }
    }

    fn vpc_output() -> VpcOutput {
        VpcOutput {
            vpc_id: "vpc-1".into(),
            vpc_cidr: "10.0.0.0/16".into(),
            private_subnets: vec!["subnet-p1".into(), "subnet-p2".into()],
            public_subnets: vec!["subnet-u1".into()],
            availability_zones: vec!["us-west-2a".into()],
        }
    }

    #[test]
    fn profile_toggles_map_to_request_fields() {
        let p = profile(
            "region: us-west-2\nautoscaling_enabled: true\nlabeling: true\ntagging: true\n\
             compute_replicas: 4\nno_wait_cluster: true\nfull_resources: true\nfips: true",
        );
        let args = ClusterArgs::from_profile(&p, &identity());

        assert_eq!(args.aws_region, "us-west-2");
        assert!(args.fips);
        assert_eq!(
            args.autoscaling,
            Some(Autoscaling {
                autoscaling_enabled: true,
                min_replicas: 3,
                max_replicas: 6
            })
        );
        assert_eq!(args.replicas, Some(4));
        assert_eq!(args.default_mp_labels.unwrap()["test1"], "testdata1");
        assert_eq!(args.tags.unwrap().len(), 2);
        assert_eq!(args.wait_for_cluster, Some(false));
        assert_eq!(args.full_resources, Some(true));

        let props = args.custom_properties.unwrap();
        assert_eq!(props["custom_property"], "test");
        assert_eq!(props["qe_usage"], "ci");
    }

    #[test]
    fn stage_fed_fields_start_unset() {
        let args = ClusterArgs::from_profile(&profile("sts: true\nbyovpc: true"), &identity());
        assert!(args.account_role_prefix.is_none());
        assert!(args.aws_subnet_ids.is_none());
        assert!(args.kms_key_arn.is_none());
        assert!(args.proxy.is_none());
    }

    #[test]
    fn public_cluster_uses_all_subnets() {
        let p = profile("byovpc: true");
        let mut args = ClusterArgs::from_profile(&p, &identity());
        args.fold_vpc(&vpc_output(), &p).unwrap();
        assert_eq!(
            args.aws_subnet_ids.unwrap(),
            vec!["subnet-p1", "subnet-p2", "subnet-u1"]
        );
        assert_eq!(args.aws_availability_zones.unwrap(), vec!["us-west-2a"]);
        assert_eq!(args.machine_cidr.as_deref(), Some("10.0.0.0/16"));
    }

    #[test]
    fn private_link_uses_private_subnets_only() {
        let p = profile("byovpc: true\nprivate: true\nprivate_link: true");
        let mut args = ClusterArgs::from_profile(&p, &identity());
        args.fold_vpc(&vpc_output(), &p).unwrap();
        assert_eq!(args.aws_subnet_ids.unwrap(), vec!["subnet-p1", "subnet-p2"]);
        assert_eq!(args.private_link, Some(true));

        let private_only = profile("byovpc: true\nprivate: true");
        let mut args = ClusterArgs::from_profile(&private_only, &identity());
        args.fold_vpc(&vpc_output(), &private_only).unwrap();
        assert!(args.aws_subnet_ids.is_none());
    }

    #[test]
    fn network_without_private_subnets_is_an_output_error() {
        let p = profile("byovpc: true");
        let mut args = ClusterArgs::from_profile(&p, &identity());
        let err = args.fold_vpc(&VpcOutput::default(), &p).unwrap_err();
        assert!(matches!(err, ForgeError::StageOutput { .. }));
    }

    #[test]
    fn shared_vpc_zones_replace_network_zones() {
        let p = profile("sts: true\nbyovpc: true\nshared_vpc: true");
        let mut args = ClusterArgs::from_profile(&p, &identity());
        args.fold_vpc(&vpc_output(), &p).unwrap();
        assert!(args.aws_availability_zones.is_none());

        args.fold_shared_vpc(
            "dns-123",
            &SharedVpcPolicyOutput {
                shared_role: "arn:aws:iam::1:role/shared".into(),
                hosted_zone_id: "Z123".into(),
                azs: vec!["us-west-2c".into()],
            },
        );
        assert_eq!(args.base_dns_domain.as_deref(), Some("dns-123"));
        assert_eq!(args.private_hosted_zone.unwrap().id, "Z123");
        assert_eq!(args.aws_availability_zones.unwrap(), vec!["us-west-2c"]);
    }

    #[test]
    fn security_groups_fill_every_slot() {
        let mut args = ClusterArgs::default();
        let output = SecurityGroupsOutput {
            sg_ids: (0..7).map(|i| format!("sg-{i}")).collect(),
        };
        args.fold_security_groups(&output, 2).unwrap();
        assert_eq!(
            args.additional_compute_security_groups.as_deref(),
            Some(&["sg-0".to_string(), "sg-1".to_string()][..])
        );
        assert_eq!(
            args.additional_infra_security_groups,
            args.additional_control_plane_security_groups
        );

        assert!(args.fold_security_groups(&output, 8).is_err());
    }

    #[test]
    fn proxy_takes_first_endpoint() {
        let mut args = ClusterArgs::default();
        assert!(args.fold_proxy(&ProxyOutput::default()).is_err());

        args.fold_proxy(&ProxyOutput {
            proxies: vec![ProxyEndpoint {
                http_proxy: "http://10.0.0.5:8080".into(),
                https_proxy: "http://10.0.0.5:8080".into(),
                no_proxy: ".internal".into(),
                additional_trust_bundle: "-----BEGIN CERTIFICATE-----".into(),
            }],
        })
        .unwrap();
        assert_eq!(args.proxy.unwrap().no_proxy, ".internal");
    }

    #[test]
    fn etcd_key_overrides_shared_key() {
        let p = profile("cluster_type: rosa-hcp\nkms_key_arn: true\netcd_encryption: true");
        let mut args = ClusterArgs::default();
        args.fold_kms("arn:key/1", &p);
        assert_eq!(args.kms_key_arn.as_deref(), Some("arn:key/1"));
        assert_eq!(args.etcd_kms_key_arn.as_deref(), Some("arn:key/1"));
        assert_eq!(args.etcd_encryption, Some(true));

        args.fold_etcd_kms("arn:key/2");
        assert_eq!(args.etcd_kms_key_arn.as_deref(), Some("arn:key/2"));
        assert_eq!(args.kms_key_arn.as_deref(), Some("arn:key/1"));
    }

    #[test]
    fn profile_network_settings_win() {
        let p = profile(
            "byovpc: true\nmachine_cidr: 10.1.0.0/16\nhost_prefix: 24\nworker_disk_size: 200",
        );
        let mut args = ClusterArgs::from_profile(&p, &identity());
        args.fold_vpc(&vpc_output(), &p).unwrap();
        args.apply_profile_network(&p);
        assert_eq!(args.machine_cidr.as_deref(), Some("10.1.0.0/16"));
        assert_eq!(args.host_prefix, Some(24));
        assert_eq!(args.worker_disk_size, Some(200));
    }
}
