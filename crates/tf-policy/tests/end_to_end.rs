// end_to_end.rs — Policy files on disk through to dispatch decisions.
//
// Each scenario writes a real policy file, opens a Firewall on it the way a
// dispatcher would at startup, and checks the decisions for a handful of
// actions:
//
//   1. whole operation blocked
//   2. exact value on one argument
//   3. substring ("contains") match
//   4. empty / absent policy allows everything
//
// Plus the load-time failure modes that must stop a run before it starts.

use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use tf_policy::{
    DeniedRule, DenialAction, Firewall, FirewallConfig, PolicyLoadError, RuntimeAction,
};

/// Write `yaml` to a policy file and open a firewall on it.
fn firewall_with(yaml: &str) -> (TempDir, Firewall) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.yml");
    fs::write(&path, yaml).unwrap();
    let fw = Firewall::open(&FirewallConfig::with_policy_path(&path)).unwrap();
    (dir, fw)
}

#[test]
fn scenario_blocked_operation() {
    let (_dir, fw) = firewall_with("shell: null\n");

    let denied = fw
        .check(&RuntimeAction::new("shell").with_arg("cmd", "ls"))
        .unwrap_err();
    assert_eq!(denied.operation, "shell");
    assert_eq!(denied.argument, None);
    assert_eq!(denied.rule, DeniedRule::OperationBlocked);
    assert!(denied.to_string().contains("shell"));
}

#[test]
fn scenario_exact_value() {
    let (_dir, fw) = firewall_with("copy:\n  dest:\n    - /etc/passwd\n");

    let denied = fw
        .check(
            &RuntimeAction::new("copy")
                .with_arg("dest", "/etc/passwd")
                .with_arg("src", "x"),
        )
        .unwrap_err();
    assert_eq!(denied.operation, "copy");
    assert_eq!(denied.argument.as_deref(), Some("dest"));
    assert_eq!(denied.rule, DeniedRule::Exact(json!("/etc/passwd")));
    assert!(denied.to_string().contains("/etc/passwd"));

    assert!(fw
        .check(&RuntimeAction::new("copy").with_arg("dest", "/tmp/x"))
        .is_ok());
}

#[test]
fn scenario_contains() {
    let (_dir, fw) = firewall_with("command:\n  cmd:\n    - \"contains rm -rf\"\n");

    for cmd in ["rm -rf /data", "echo rm -rf"] {
        let denied = fw
            .check(&RuntimeAction::new("command").with_arg("cmd", cmd))
            .unwrap_err();
        assert_eq!(denied.argument.as_deref(), Some("cmd"));
        assert_eq!(denied.rule, DeniedRule::Contains("rm -rf".into()));
    }

    assert!(fw
        .check(&RuntimeAction::new("command").with_arg("cmd", "remove stuff"))
        .is_ok());
}

#[test]
fn scenario_empty_policy_allows_everything() {
    let (_dir, fw) = firewall_with("{}\n");
    let absent = TempDir::new().unwrap();
    let fw_absent = Firewall::open(&FirewallConfig::with_policy_path(
        absent.path().join("missing.yml"),
    ))
    .unwrap();

    let actions = [
        RuntimeAction::new("shell").with_arg("cmd", "rm -rf /"),
        RuntimeAction::new("copy").with_arg("dest", "/etc/passwd"),
        RuntimeAction::new("anything"),
    ];
    for action in &actions {
        assert!(fw.check(action).is_ok());
        assert!(fw_absent.check(action).is_ok());
    }
    assert!(fw_absent.store().source().is_absent());
}

#[test]
fn mixed_policy_dispatch_run() {
    let policy = r#"
# Operations nobody may run.
shell: ~
raw: blocked

copy:
  content: blocked
  dest:
    - /etc/passwd
    - /etc/shadow
    - "contains /root/.ssh"

service:
  port:
    - 22
"#;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.yml");
    fs::write(&path, policy).unwrap();
    let config = FirewallConfig::with_policy_path(&path).on_deny(DenialAction::Skip);
    let fw = Firewall::open(&config).unwrap();

    let run = vec![
        RuntimeAction::new("ping"),
        RuntimeAction::new("copy").with_arg("dest", "/root/.ssh/authorized_keys"),
        RuntimeAction::new("copy").with_arg("dest", "/srv/app.conf"),
        RuntimeAction::new("service").with_arg("port", "22"),
        RuntimeAction::new("service").with_arg("port", 22),
        RuntimeAction::new("raw").with_arg("free_form", "uptime"),
    ];

    let mut executed = Vec::new();
    for (i, action) in run.iter().enumerate() {
        let _ = fw.guard(action, || executed.push(i));
    }
    // "22" as a string is not the number 22.
    assert_eq!(executed, vec![0, 2, 3]);

    let outcome = fw.check_batch(&run);
    assert_eq!(outcome.allowed, vec![0, 2, 3]);
    let denied: Vec<usize> = outcome.denied.iter().map(|(i, _)| *i).collect();
    assert_eq!(denied, vec![1, 4, 5]);
}

#[test]
fn malformed_policy_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("policy.yml");

    fs::write(&path, "- shell\n").unwrap();
    let err = Firewall::open(&FirewallConfig::with_policy_path(&path))
        .err()
        .unwrap();
    assert!(matches!(err, PolicyLoadError::Malformed { .. }));

    fs::write(&path, "copy:\n  dest: [\"/etc/passwd\"\n").unwrap();
    let err = Firewall::open(&FirewallConfig::with_policy_path(&path))
        .err()
        .unwrap();
    assert!(matches!(err, PolicyLoadError::Syntax { .. }));
}

#[test]
fn shared_rule_blocks_and_boolean_words_are_enforced() {
    let policy = r#"
protected: &protected
  dest: [/etc/passwd]

copy:
  <<: *protected
  mode: ["0777"]

file:
  recurse: [yes]
"#;
    let (_dir, fw) = firewall_with(policy);

    let denied = fw
        .check(&RuntimeAction::new("copy").with_arg("dest", "/etc/passwd"))
        .unwrap_err();
    assert_eq!(denied.argument.as_deref(), Some("dest"));

    for value in [json!(true), json!("yes")] {
        let denied = fw
            .check(&RuntimeAction::new("file").with_arg("recurse", value))
            .unwrap_err();
        assert_eq!(denied.argument.as_deref(), Some("recurse"));
    }
    assert!(fw
        .check(&RuntimeAction::new("file").with_arg("recurse", false))
        .is_ok());
}

#[test]
fn non_finite_matcher_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.yml");
    fs::write(&path, "svc:\n  port: [.nan, .inf]\n").unwrap();

    let err = Firewall::open(&FirewallConfig::with_policy_path(&path))
        .err()
        .unwrap();
    assert!(matches!(err, PolicyLoadError::Malformed { .. }));
}
