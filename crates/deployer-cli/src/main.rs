mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use deployer_core::run_log::PassKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "deployer",
    about = "Place workloads across private, public and legacy targets from cluster-held policies",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./deployer.yaml when present, else built-in defaults)
    #[arg(long, global = true, env = "DEPLOYER_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP front door until Ctrl-C
    Serve {
        /// Address to listen on (overrides `listen` in the config)
        #[arg(long)]
        listen: Option<String>,
    },

    /// Run an apply pass in the foreground
    Deploy {
        /// Deployment directory holding namespaces/, policies/ and apps/
        #[arg(long)]
        dir: PathBuf,
        /// Revision recorded with the pass
        #[arg(long, default_value = "")]
        rev: String,
    },

    /// Run a delete pass in the foreground
    Delete {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value = "")]
        rev: String,
    },

    /// Print the placement plan without executing it
    Plan {
        /// Plan one group offline from the given labels instead of reading the cluster
        #[arg(long)]
        group: Option<String>,
        /// Placement label granted to the group (repeatable)
        #[arg(long = "label", requires = "group")]
        labels: Vec<String>,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Deploy { .. } | Commands::Delete { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = cmd::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Serve { listen } => cmd::serve::run(config, listen),
        Commands::Deploy { dir, rev } => {
            cmd::pass::run(config, PassKind::Apply, &dir, &rev, cli.json)
        }
        Commands::Delete { dir, rev } => {
            cmd::pass::run(config, PassKind::Delete, &dir, &rev, cli.json)
        }
        Commands::Plan { group, labels } => {
            cmd::plan::run(&config, group.as_deref(), &labels, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
