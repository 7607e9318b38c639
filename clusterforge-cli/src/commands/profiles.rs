use clap::Args;
use clusterforge::ClusterType;
use comfy_table::{Table, presets::NOTHING};

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Only list profiles of this cluster type (rosa-classic, rosa-hcp)
    #[arg(long = "type", value_name = "TYPE")]
    pub cluster_type: Option<String>,

    /// Only print profile names
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: ProfilesArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let wanted = args
        .cluster_type
        .as_deref()
        .map(str::parse::<ClusterType>)
        .transpose()?;
    let provisioner = global.create_provisioner()?;
    let catalog = provisioner.catalog();

    if catalog.is_empty() {
        anyhow::bail!(
            "No profiles found; pass --profiles-dir or set {}",
            clusterforge::runtime::constants::envs::PROFILES_DIR
        );
    }

    let entries: Vec<_> = catalog
        .names()
        .filter_map(|name| catalog.entry(name).map(|p| (name, p)))
        .filter(|(_, p)| wanted.is_none_or(|t| p.cluster_type == t))
        .collect();

    if args.quiet {
        for (name, _) in entries {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec!["NAME", "TYPE", "STS", "BYOVPC", "REGION", "VERSION"]);
    for (name, p) in entries {
        table.add_row(vec![
            name.to_string(),
            p.cluster_type.as_str().to_string(),
            p.sts.to_string(),
            p.byovpc.to_string(),
            p.region.clone(),
            if p.version.is_empty() {
                p.version_pattern.clone()
            } else {
                p.version.clone()
            },
        ]);
    }
    println!("{table}");
    Ok(())
}
