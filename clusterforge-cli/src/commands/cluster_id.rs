use clap::Args;

#[derive(Args, Debug)]
pub struct ClusterIdArgs {
    /// Profile name
    pub profile: String,
}

pub async fn execute(args: ClusterIdArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provisioner = global.create_provisioner()?;
    let id = provisioner.retrieve_cluster_id(&args.profile).await?;
    println!("{}", id);
    Ok(())
}
