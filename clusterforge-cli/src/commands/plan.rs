use clap::{Args, ValueEnum};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Profile name
    pub profile: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Print the stages in teardown order instead
    #[arg(long)]
    pub teardown: bool,
}

pub async fn execute(args: PlanArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provisioner = global.create_provisioner()?;
    let graph = provisioner.plan(&args.profile)?;
    let stages = if args.teardown {
        graph.teardown_order()?
    } else {
        graph.order()?
    };

    match args.format {
        Format::Text => {
            for (i, stage) in stages.iter().enumerate() {
                println!("{}. {}", i + 1, stage);
            }
            println!("{}. cluster", stages.len() + 1);
        }
        Format::Json => {
            let edges: Vec<_> = graph
                .edges()
                .into_iter()
                .map(|(from, to)| serde_json::json!({ "from": from.label(), "to": to.label() }))
                .collect();
            let doc = serde_json::json!({
                "profile": args.profile,
                "stages": stages.iter().map(|s| s.label()).collect::<Vec<_>>(),
                "edges": edges,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}
