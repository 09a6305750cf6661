// batch.rs — `tf batch`: evaluate a JSON-lines file of actions.
//
// One action per line:
//   {"operation": "copy", "arguments": {"dest": "/etc/passwd"}}
// Blank lines and lines starting with '#' are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tf_policy::{BatchOutcome, DenialAction, Firewall, PolicyStore, RuntimeAction};

#[derive(Args)]
pub struct BatchArgs {
    /// JSON-lines file of actions.
    pub file: PathBuf,

    /// What to do after a denial: abort the run or skip the action.
    #[arg(long, default_value = "abort")]
    pub on_deny: DenialAction,
}

pub fn execute(args: &BatchArgs, policy: &Path) -> anyhow::Result<()> {
    let store = PolicyStore::load(policy)?;
    let firewall = Firewall::from_store(store, args.on_deny);

    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let actions = parse_actions(&content)?;

    let outcome = firewall.check_batch(actions.iter().map(|(_, action)| action));

    for line in report(&actions, &outcome) {
        println!("{}", line);
    }

    if outcome.all_allowed() {
        println!("{} action(s) allowed.", outcome.allowed.len());
        return Ok(());
    }
    if outcome.aborted {
        anyhow::bail!(
            "run aborted: {} action(s) allowed, 1 denied, {} not evaluated",
            outcome.allowed.len(),
            outcome.not_evaluated
        );
    }
    anyhow::bail!(
        "{} action(s) allowed, {} denied and skipped",
        outcome.allowed.len(),
        outcome.denied.len()
    )
}

/// Parse the file into (1-based line number, action) pairs.
fn parse_actions(content: &str) -> anyhow::Result<Vec<(usize, RuntimeAction)>> {
    let mut actions = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let action: RuntimeAction = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: not a valid action", i + 1))?;
        actions.push((i + 1, action));
    }
    Ok(actions)
}

/// One line per evaluated action, in file order.
fn report(actions: &[(usize, RuntimeAction)], outcome: &BatchOutcome) -> Vec<String> {
    let mut lines: Vec<(usize, String)> = outcome
        .allowed
        .iter()
        .map(|&i| {
            let (line, action) = &actions[i];
            (*line, format!("line {:<5} ALLOW {}", line, action.operation))
        })
        .chain(outcome.denied.iter().map(|(i, denied)| {
            let (line, _) = &actions[*i];
            (*line, format!("line {:<5} DENY  {}", line, denied))
        }))
        .collect();
    lines.sort_by_key(|(line, _)| *line);
    lines.into_iter().map(|(_, text)| text).collect()
}
