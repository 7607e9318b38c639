use clap::Args;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Profile name(s) to provision
    #[arg(required = true, num_args = 1..)]
    pub profiles: Vec<String>,

    /// Print the full outcome as JSON instead of the cluster id
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: CreateArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provisioner = global.create_provisioner()?;

    let mut errors = Vec::new();
    for profile in &args.profiles {
        match provisioner.provision(profile).await {
            Ok(outcome) if args.json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            Ok(outcome) => println!("{}", outcome.cluster_id),
            Err(e) => {
                eprintln!("Error provisioning '{}': {}", profile, e);
                errors.push(format!("{}: {}", profile, e));
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!(
            "Failed to provision {} of {} profile(s)\nErrors:\n  {}",
            errors.len(),
            args.profiles.len(),
            errors.join("\n  ")
        );
    }
    Ok(())
}
