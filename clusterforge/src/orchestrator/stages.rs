//! Running one stage: build its args, apply, read back, fold.

use super::plan::StageKind;
use crate::artifacts::ArtifactStore;
use crate::profile::Profile;
use crate::runtime::constants::{DUPLICATE_SCOPE_SUFFIX, defaults};
use crate::runtime::options::ProvisionerOptions;
use crate::services::{
    AccountRolesArgs, AccountRolesOutput, ClusterArgs, DnsDomainArgs, DnsDomainOutput,
    EngineService, Kms, KmsArgs, OperatorRolesArgs, OperatorRolesOutput, ProxyArgs,
    ResourceKind, ResourceService, SecurityGroupsArgs, Services, SharedVpcPolicyArgs,
    StageHandle, VpcArgs, VpcOutput,
};
use crate::teardown::TeardownCoordinator;
use crate::util::major_minor;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use std::sync::Arc;

/// Service of the dedicated etcd key, in the duplicate scope.
pub(crate) fn etcd_kms_service(services: &Services) -> EngineService<Kms> {
    services
        .scoped(DUPLICATE_SCOPE_SUFFIX)
        .kms()
        .labeled(StageKind::EtcdKms.label())
}

/// Destroy handle of a planned stage.
pub(crate) fn stage_handle(kind: StageKind, services: &Services) -> Arc<dyn StageHandle> {
    match kind {
        StageKind::AccountRoles => Arc::new(services.account_roles()),
        StageKind::OperatorRoles => Arc::new(services.operator_roles()),
        StageKind::Vpc => Arc::new(services.vpc()),
        StageKind::DnsDomain => Arc::new(services.dns_domain()),
        StageKind::SharedVpcPolicy => Arc::new(services.shared_vpc_policy()),
        StageKind::SecurityGroups => Arc::new(services.security_groups()),
        StageKind::Proxy => Arc::new(services.proxy()),
        StageKind::Kms => Arc::new(services.kms()),
        StageKind::EtcdKms => Arc::new(etcd_kms_service(services)),
    }
}

/// Apply, register for teardown, read back.
///
/// The service is registered as soon as the apply succeeds, so an output
/// failure still unwinds what was created.
async fn realize<K: ResourceKind>(
    service: EngineService<K>,
    args: &K::Args,
    teardown: &mut TeardownCoordinator,
) -> ForgeResult<K::Output> {
    let service = Arc::new(service);
    service.apply(args).await?;
    teardown.push(Arc::clone(&service) as Arc<dyn StageHandle>);
    service.output().await
}

fn require<T>(value: Option<&T>, stage: StageKind, upstream: StageKind) -> ForgeResult<&T> {
    value.ok_or_else(|| {
        ForgeError::InvalidState(format!(
            "{stage} needs the output of {upstream}, which is not part of this plan"
        ))
    })
}

/// Outputs later stages read from.
#[derive(Debug, Default)]
struct Upstream {
    account_roles: Option<AccountRolesOutput>,
    operator_roles: Option<OperatorRolesOutput>,
    vpc: Option<VpcOutput>,
    dns_domain: Option<DnsDomainOutput>,
}

/// Executes planned stages one by one for a single run.
pub(crate) struct StageRunner<'a> {
    profile: &'a Profile,
    options: &'a ProvisionerOptions,
    services: &'a Services,
    artifacts: &'a ArtifactStore,
    upstream: Upstream,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        profile: &'a Profile,
        options: &'a ProvisionerOptions,
        services: &'a Services,
        artifacts: &'a ArtifactStore,
    ) -> Self {
        Self {
            profile,
            options,
            services,
            artifacts,
            upstream: Upstream::default(),
        }
    }

    fn shared_vpc_credentials(&self) -> ForgeResult<String> {
        self.options
            .shared_vpc_credentials_file
            .as_ref()
            .map(|p| p.display().to_string())
            .ok_or_else(|| {
                ForgeError::Config(format!(
                    "{} is required for shared-VPC profiles",
                    crate::runtime::constants::envs::SHARED_VPC_CREDENTIALS_FILE
                ))
            })
    }

    fn account_roles_args(&self, cluster: &ClusterArgs) -> AccountRolesArgs {
        let version = cluster
            .openshift_version
            .as_deref()
            .map(major_minor)
            .unwrap_or_default();
        let shared_vpc_role_arn = self.profile.shared_vpc.then(|| {
            format!(
                "arn:aws:iam::{}:role/{}-shared-vpc-role",
                defaults::SHARED_VPC_ACCOUNT_ID,
                cluster.cluster_name
            )
        });
        AccountRolesArgs {
            account_role_prefix: cluster.cluster_name.clone(),
            openshift_version: version,
            channel_group: self.profile.channel_group.clone(),
            unified_acc_roles_path: self.profile.unified_acc_roles_path.clone(),
            shared_vpc_role_arn,
        }
    }

    fn vpc_args(&self, cluster: &ClusterArgs) -> ForgeResult<VpcArgs> {
        let mut args = VpcArgs::new(
            &cluster.aws_region,
            &self.profile.zone_list(),
            self.profile.multi_az,
        );
        args.name_prefix = Some(cluster.cluster_name.clone());
        if self.profile.shared_vpc {
            args.aws_shared_credentials_files = Some(vec![self.shared_vpc_credentials()?]);
        }
        Ok(args)
    }

    fn kms_args(&self, cluster: &ClusterArgs, name: String) -> KmsArgs {
        KmsArgs {
            kms_name: name,
            aws_region: cluster.aws_region.clone(),
            account_role_prefix: self
                .upstream
                .account_roles
                .as_ref()
                .map(|out| out.account_role_prefix.clone()),
            account_role_path: self.profile.unified_acc_roles_path.clone(),
            tag_key: defaults::KMS_TAG_KEY.to_string(),
            tag_value: defaults::KMS_TAG_VALUE.to_string(),
            tag_description: defaults::KMS_TAG_DESCRIPTION.to_string(),
            hcp: self.profile.is_hcp(),
        }
    }

    /// Run `kind` and fold its output into `cluster`.
    pub async fn run(
        &mut self,
        kind: StageKind,
        cluster: &mut ClusterArgs,
        teardown: &mut TeardownCoordinator,
    ) -> ForgeResult<()> {
        tracing::info!(stage = %kind, scope = self.services.scope(), "running stage");

        match kind {
            StageKind::AccountRoles => {
                let args = self.account_roles_args(cluster);
                let out = realize(self.services.account_roles(), &args, teardown).await?;
                tracing::info!(prefix = %out.account_role_prefix, "created account roles");
                cluster.fold_account_roles(&out);
                self.upstream.account_roles = Some(out);

                if !self.options.settle_delay.is_zero() {
                    tracing::info!(
                        delay = ?self.options.settle_delay,
                        "waiting for role propagation"
                    );
                    tokio::time::sleep(self.options.settle_delay).await;
                }
            }

            StageKind::OperatorRoles => {
                let account = require(
                    self.upstream.account_roles.as_ref(),
                    kind,
                    StageKind::AccountRoles,
                )?;
                let args = OperatorRolesArgs {
                    account_role_prefix: account.account_role_prefix.clone(),
                    operator_role_prefix: cluster.cluster_name.clone(),
                    oidc_config: self.profile.oidc_config.clone(),
                    unified_acc_roles_path: self.profile.unified_acc_roles_path.clone(),
                };
                let out = realize(self.services.operator_roles(), &args, teardown).await?;
                cluster.fold_operator_roles(&out);
                self.upstream.operator_roles = Some(out);
            }

            StageKind::Vpc => {
                let args = self.vpc_args(cluster)?;
                let out = realize(self.services.vpc(), &args, teardown).await?;
                cluster.fold_vpc(&out, self.profile)?;
                self.upstream.vpc = Some(out);
            }

            StageKind::DnsDomain => {
                let args = DnsDomainArgs::default();
                let out = realize(self.services.dns_domain(), &args, teardown).await?;
                self.upstream.dns_domain = Some(out);
            }

            StageKind::SharedVpcPolicy => {
                let account = require(
                    self.upstream.account_roles.as_ref(),
                    kind,
                    StageKind::AccountRoles,
                )?;
                let operator = require(
                    self.upstream.operator_roles.as_ref(),
                    kind,
                    StageKind::OperatorRoles,
                )?;
                let vpc = require(self.upstream.vpc.as_ref(), kind, StageKind::Vpc)?;
                let dns = require(self.upstream.dns_domain.as_ref(), kind, StageKind::DnsDomain)?;

                let subnets = cluster.aws_subnet_ids.clone().unwrap_or_else(|| {
                    vpc.private_subnets
                        .iter()
                        .chain(&vpc.public_subnets)
                        .cloned()
                        .collect()
                });
                let args = SharedVpcPolicyArgs {
                    shared_vpc_aws_shared_credentials_files: vec![self.shared_vpc_credentials()?],
                    region: cluster.aws_region.clone(),
                    cluster_name: cluster.cluster_name.clone(),
                    dns_domain_id: dns.dns_domain_id.clone(),
                    ingress_operator_role_arn: operator.ingress_operator_role_arn.clone(),
                    installer_role_arn: account.installer_role_arn.clone(),
                    cluster_aws_account: account.aws_account_id.clone(),
                    vpc_id: vpc.vpc_id.clone(),
                    subnets,
                    domain_prefix: cluster.domain_prefix.clone(),
                };
                let dns_domain_id = dns.dns_domain_id.clone();
                let out = realize(self.services.shared_vpc_policy(), &args, teardown).await?;
                cluster.fold_shared_vpc(&dns_domain_id, &out);
            }

            StageKind::SecurityGroups => {
                let vpc = require(self.upstream.vpc.as_ref(), kind, StageKind::Vpc)?;
                let count = self.profile.additional_sg_number;
                let args = SecurityGroupsArgs {
                    aws_region: cluster.aws_region.clone(),
                    vpc_id: vpc.vpc_id.clone(),
                    sg_number: count + defaults::EXTRA_SECURITY_GROUPS,
                    name_prefix: defaults::SECURITY_GROUP_NAME_PREFIX.to_string(),
                };
                let out = realize(self.services.security_groups(), &args, teardown).await?;
                cluster.fold_security_groups(&out, count)?;
            }

            StageKind::Proxy => {
                let vpc = require(self.upstream.vpc.as_ref(), kind, StageKind::Vpc)?;
                let public_subnet = vpc.public_subnets.first().ok_or_else(|| {
                    ForgeError::InvalidState("egress-proxy needs a public subnet".to_string())
                })?;
                let args = ProxyArgs {
                    proxy_count: 1,
                    aws_region: cluster.aws_region.clone(),
                    vpc_id: vpc.vpc_id.clone(),
                    subnet_public_id: public_subnet.clone(),
                    trust_bundle_path: self.artifacts.trust_bundle_path().display().to_string(),
                    key_pair_id: Some(cluster.cluster_name.clone()),
                };
                let out = realize(self.services.proxy(), &args, teardown).await?;
                cluster.fold_proxy(&out)?;
            }

            StageKind::Kms => {
                let args = self.kms_args(cluster, cluster.cluster_name.clone());
                let out = realize(self.services.kms(), &args, teardown).await?;
                cluster.fold_kms(&out.key_arn, self.profile);
            }

            StageKind::EtcdKms => {
                let args = self.kms_args(cluster, format!("{}-2", cluster.cluster_name));
                let out = realize(etcd_kms_service(self.services), &args, teardown).await?;
                cluster.fold_etcd_kms(&out.key_arn);
            }
        }

        tracing::info!(stage = %kind, "stage complete");
        Ok(())
    }
}
