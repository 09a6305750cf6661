//! # tf-cli
//!
//! Operator command-line interface for the task firewall.
//!
//! - `tf validate` — load the policy and report what it contains
//! - `tf show` — print every rule in the policy (`--json` for the decoded form)
//! - `tf check` — evaluate a single action against the policy
//! - `tf batch` — evaluate a JSON-lines file of actions

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tf_policy::DEFAULT_POLICY_PATH;
use tracing_subscriber::EnvFilter;

/// Task firewall CLI — validate and exercise admission policies.
#[derive(Parser)]
#[command(name = "tf", version, about)]
struct Cli {
    /// Policy file to load.
    #[arg(long, global = true, default_value = DEFAULT_POLICY_PATH)]
    policy: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the policy and report whether it is valid.
    Validate,
    /// Print every operation, argument and matcher in the policy.
    Show {
        /// Print the decoded policy as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one action against the policy.
    Check(commands::check::CheckArgs),
    /// Evaluate a JSON-lines file of actions.
    Batch(commands::batch::BatchArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    tracing::debug!("using policy {}", cli.policy.display());

    match &cli.command {
        Commands::Validate => commands::validate::execute(&cli.policy),
        Commands::Show { json } => commands::show::execute(&cli.policy, *json),
        Commands::Check(args) => commands::check::execute(args, &cli.policy),
        Commands::Batch(args) => commands::batch::execute(args, &cli.policy),
    }
}

/// Logs go to stderr so they don't interfere with command output on stdout.
fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("tf_policy={}", level).parse()?)
                .add_directive(format!("tf={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}
