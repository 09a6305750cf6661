// validate.rs — `tf validate`: load the policy and summarize it.

use std::path::Path;

use tf_policy::PolicyStore;

pub fn execute(policy: &Path) -> anyhow::Result<()> {
    let store = PolicyStore::load(policy)?;

    if store.source().is_absent() {
        println!(
            "No policy at {}, every action will be allowed.",
            policy.display()
        );
        return Ok(());
    }

    let doc = store.document();
    println!(
        "Policy {} is valid: {} operation rule(s), {} value matcher(s).",
        policy.display(),
        doc.len(),
        doc.matcher_count()
    );
    Ok(())
}
