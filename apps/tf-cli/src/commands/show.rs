// show.rs — `tf show`: print the policy as the firewall understands it.

use std::path::Path;

use tf_policy::{ArgumentRule, OperationRule, PolicyDocument, PolicyStore};

pub fn execute(policy: &Path, json: bool) -> anyhow::Result<()> {
    let store = PolicyStore::load(policy)?;

    if json {
        println!("{}", to_json(store.document())?);
        return Ok(());
    }

    if store.document().is_empty() {
        println!("No rules, every action is allowed.");
        return Ok(());
    }

    for line in render(store.document()) {
        println!("{}", line);
    }
    Ok(())
}

/// The decoded policy as pretty JSON, operations sorted by name.
fn to_json(doc: &PolicyDocument) -> anyhow::Result<String> {
    // Going through `Value` sorts the operation map.
    let value = serde_json::to_value(doc)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// One line per operation, argument and matcher, operations sorted by name.
fn render(doc: &PolicyDocument) -> Vec<String> {
    let mut lines = Vec::new();
    for name in doc.operations() {
        match doc.rule(name) {
            Some(OperationRule::Blocked) => lines.push(format!("{:<20} BLOCKED", name)),
            Some(OperationRule::ArgumentRules(args)) => {
                lines.push(name.to_string());
                for (arg, rule) in args {
                    match rule {
                        ArgumentRule::Blocked => {
                            lines.push(format!("  {:<18} BLOCKED", arg));
                        }
                        ArgumentRule::ValueRules(matchers) => {
                            lines.push(format!("  {}", arg));
                            for m in matchers {
                                lines.push(format!("    - {}", m.describe()));
                            }
                        }
                    }
                }
            }
            None => {}
        }
    }
    lines
}
