use clap::{Args, Parser, Subcommand};
use rolemap_core::ReconciliationIntent;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::apply::ApplyOptions;

#[derive(Parser, Debug)]
#[command(
    name = "rolemap",
    version,
    about = "Reconcile the role mappings of a Keycloak group"
)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. "debug", "rolemap_runtime=trace").
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the group's role mappings and print the result as JSON.
    Apply(ApplyArgs),

    /// Show what `apply` would change without changing anything.
    Plan {
        /// Path to the configuration file
        #[arg(short, long, default_value = "rolemap.yaml")]
        config: PathBuf,

        /// Include before/after role lists in the output
        #[arg(long, default_value_t = false)]
        diff: bool,
    },

    /// Load and validate the configuration without contacting the directory.
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "rolemap.yaml")]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "rolemap.yaml")]
    config: PathBuf,

    /// Compute the changes but do not apply them
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Include before/after role lists in the output
    #[arg(long, default_value_t = false)]
    diff: bool,

    /// Override the desired state from the configuration file
    #[arg(long)]
    state: Option<ReconciliationIntent>,

    /// Override the realm from the configuration file
    #[arg(long)]
    realm: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON result; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Apply(args) => {
            let options = ApplyOptions {
                check: args.check,
                diff: args.diff,
                state: args.state,
                realm: args.realm,
            };
            commands::apply::run(&args.config, &options).await?
        }

        Command::Plan { config, diff } => {
            let options = ApplyOptions {
                check: true,
                diff,
                ..Default::default()
            };
            commands::apply::run(&config, &options).await?
        }

        Command::Validate { config } => commands::validate::run(&config)?,
    }

    Ok(())
}
