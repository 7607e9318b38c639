use clap::Args;

#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Profile name(s) to decommission
    #[arg(required = true, num_args = 1..)]
    pub profiles: Vec<String>,
}

pub async fn execute(args: DestroyArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provisioner = global.create_provisioner()?;

    let mut errors = Vec::new();
    let mut success_count = 0;

    for profile in &args.profiles {
        if let Err(e) = provisioner.decommission(profile).await {
            eprintln!("Error destroying '{}': {}", profile, e);
            errors.push(format!("{}: {}", profile, e));
        } else {
            println!("{}", profile);
            success_count += 1;
        }
    }

    if !errors.is_empty() {
        let error_summary = if success_count > 0 {
            format!(
                "Failed to destroy {} of {} profile(s)",
                errors.len(),
                errors.len() + success_count
            )
        } else {
            format!("Failed to destroy all {} profile(s)", errors.len())
        };

        anyhow::bail!("{}\nErrors:\n  {}", error_summary, errors.join("\n  "));
    }
    Ok(())
}
