// check.rs — `tf check`: evaluate one action against the policy.
//
// Arguments given with --arg are always strings; --arg-json parses the value
// as JSON so numbers, booleans and structures can be tested with their real
// types:
//
//   tf check copy --arg dest=/etc/passwd
//   tf check service --arg-json port=22 --trace

use std::path::Path;

use clap::Args;
use tf_policy::{Decision, DenialAction, Firewall, PolicyStore, RuntimeAction};

#[derive(Args)]
pub struct CheckArgs {
    /// Operation name (e.g. "copy", "shell").
    pub operation: String,

    /// String argument, as KEY=VALUE. Repeatable.
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// JSON-typed argument, as KEY=JSON. Repeatable.
    #[arg(long = "arg-json", value_name = "KEY=JSON")]
    pub json_args: Vec<String>,

    /// Print the full evaluation trace as JSON.
    #[arg(long)]
    pub trace: bool,
}

pub fn execute(args: &CheckArgs, policy: &Path) -> anyhow::Result<()> {
    let store = PolicyStore::load(policy)?;
    let firewall = Firewall::from_store(store, DenialAction::Abort);
    let action = build_action(args)?;

    let trace = firewall.explain(&action);
    if args.trace {
        println!("{}", serde_json::to_string_pretty(&trace)?);
    }

    match trace.decision {
        Decision::Allow => {
            println!("ALLOW {}", action.operation);
            Ok(())
        }
        Decision::Deny { reason } => {
            println!("DENY  {}", action.operation);
            anyhow::bail!(reason)
        }
    }
}

/// Assemble the runtime action from the command-line arguments.
fn build_action(args: &CheckArgs) -> anyhow::Result<RuntimeAction> {
    let mut action = RuntimeAction::new(args.operation.as_str());
    for raw in &args.args {
        let (key, value) = split_key_value(raw)?;
        action = action.with_arg(key, value);
    }
    for raw in &args.json_args {
        let (key, value) = split_key_value(raw)?;
        let parsed: serde_json::Value = serde_json::from_str(value)
            .map_err(|e| anyhow::anyhow!("--arg-json {}: invalid JSON: {}", key, e))?;
        action = action.with_arg(key, parsed);
    }
    Ok(action)
}

fn split_key_value(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => anyhow::bail!("expected KEY=VALUE, got '{}'", raw),
    }
}
