use clap::Args;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Profile name
    pub profile: String,
}

pub async fn execute(args: VersionArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provisioner = global.create_provisioner()?;
    match provisioner.resolve_version(&args.profile).await? {
        Some(version) => println!("{}", version),
        None => println!("(backend default)"),
    }
    Ok(())
}
