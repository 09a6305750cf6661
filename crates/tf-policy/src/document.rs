// document.rs — The in-memory policy document.
//
// The policy file is loosely typed: under an operation name you may find a
// scalar (block the operation) or a mapping of argument rules; under an
// argument name a scalar (block the argument) or a list of value matchers.
// That shape is decided exactly once here, at load time, and turned into
// closed enums. Evaluation never inspects YAML types.
//
//   shell: ~                      # operation blocked
//   copy:
//     src: yes                    # argument blocked whenever present
//     dest:
//       - /etc/passwd             # exact
//       - "contains /root/.ssh"   # substring
//
// Argument rules keep document order; it decides which denial is reported
// first when several arguments would match.

use std::collections::HashMap;

use serde::Serialize;
use serde_yaml::Value as YamlValue;

use crate::error::SchemaError;
use crate::matcher::ValueMatcher;

/// Rule attached to one operation name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "arguments", rename_all = "snake_case")]
pub enum OperationRule {
    /// Every invocation of the operation is denied.
    Blocked,
    /// Arguments are checked one by one, in document order.
    ArgumentRules(Vec<(String, ArgumentRule)>),
}

/// Rule attached to one argument of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "matchers", rename_all = "snake_case")]
pub enum ArgumentRule {
    /// Any invocation carrying this argument is denied.
    Blocked,
    /// Matchers tried in document order; the first match denies.
    ValueRules(Vec<ValueMatcher>),
}

/// A validated, immutable policy: operation name → rule.
///
/// Absence of an operation means it is unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyDocument {
    operations: HashMap<String, OperationRule>,
}

impl PolicyDocument {
    /// The empty policy: every action is allowed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a policy from YAML text.
    ///
    /// Syntax errors surface as `serde_yaml::Error`; shape errors as
    /// [`SchemaError`]. The store wraps both with the file path.
    ///
    /// Merge keys (`<<: *anchor`) are expanded before decoding, so shared
    /// rule blocks apply wherever they are merged in.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        let mut tree: YamlValue = serde_yaml::from_str(yaml).map_err(DocumentError::Syntax)?;
        tree.apply_merge().map_err(DocumentError::Syntax)?;
        Self::from_yaml(tree).map_err(DocumentError::Schema)
    }

    /// Decode an already-parsed YAML tree.
    ///
    /// A null tree (an empty file) is the empty policy. Anything other than
    /// a mapping at the top level is rejected.
    pub fn from_yaml(tree: YamlValue) -> Result<Self, SchemaError> {
        let mapping = match tree {
            YamlValue::Null => return Ok(Self::empty()),
            YamlValue::Mapping(m) => m,
            other => {
                return Err(SchemaError::new(
                    "<root>",
                    format!(
                        "top level must be a mapping of operation names, found {}",
                        kind_of(&other)
                    ),
                ))
            }
        };

        let mut operations = HashMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let operation = key_string(&key, "<root>")?;
            let rule = decode_operation(&operation, value)?;
            operations.insert(operation, rule);
        }
        Ok(Self { operations })
    }

    /// Look up the rule for an operation (exact, case-sensitive).
    pub fn rule(&self, operation: &str) -> Option<&OperationRule> {
        self.operations.get(operation)
    }

    /// Operation names that carry a rule, sorted for stable display.
    pub fn operations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Total number of value matchers across all argument rules.
    pub fn matcher_count(&self) -> usize {
        self.operations
            .values()
            .filter_map(|rule| match rule {
                OperationRule::ArgumentRules(args) => Some(args),
                OperationRule::Blocked => None,
            })
            .flatten()
            .map(|(_, arg)| match arg {
                ArgumentRule::ValueRules(matchers) => matchers.len(),
                ArgumentRule::Blocked => 0,
            })
            .sum()
    }
}

/// Failure to build a document from YAML text.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid YAML: {0}")]
    Syntax(#[source] serde_yaml::Error),

    #[error("invalid policy: {0}")]
    Schema(#[source] SchemaError),
}

fn decode_operation(operation: &str, value: YamlValue) -> Result<OperationRule, SchemaError> {
    match value {
        YamlValue::Mapping(args) => {
            let mut rules = Vec::with_capacity(args.len());
            for (key, value) in args {
                let argument = key_string(&key, operation)?;
                let location = format!("{}.{}", operation, argument);
                rules.push((argument, decode_argument(&location, value)?));
            }
            Ok(OperationRule::ArgumentRules(rules))
        }
        YamlValue::Sequence(_) => Err(SchemaError::new(
            operation,
            "operation rule must be a scalar (block) or a mapping of argument rules, found a sequence",
        )),
        YamlValue::Tagged(tagged) => decode_operation(operation, tagged.value),
        _ => Ok(OperationRule::Blocked),
    }
}

fn decode_argument(location: &str, value: YamlValue) -> Result<ArgumentRule, SchemaError> {
    match value {
        YamlValue::Sequence(entries) => {
            let mut matchers = Vec::with_capacity(entries.len());
            for (i, mut entry) in entries.into_iter().enumerate() {
                let entry_location = format!("{}[{}]", location, i);
                while let YamlValue::Tagged(tagged) = entry {
                    entry = tagged.value;
                }
                if has_non_finite(&entry) {
                    return Err(SchemaError::new(
                        entry_location,
                        "NaN and infinite numbers cannot be matched",
                    ));
                }
                let bool_word = match &entry {
                    YamlValue::String(s) => yaml11_bool(s),
                    _ => None,
                };
                let entry = serde_json::to_value(&entry).map_err(|e| {
                    SchemaError::new(
                        entry_location,
                        format!("value cannot be used as a matcher: {}", e),
                    )
                })?;
                matchers.push(ValueMatcher::from_entry(entry));
                if let Some(b) = bool_word {
                    matchers.push(ValueMatcher::Exact(serde_json::Value::Bool(b)));
                }
            }
            Ok(ArgumentRule::ValueRules(matchers))
        }
        YamlValue::Tagged(tagged) => decode_argument(location, tagged.value),
        // Anything that is not a list blocks the argument outright.
        _ => Ok(ArgumentRule::Blocked),
    }
}

/// YAML 1.1 boolean words (`yes`, `off`, ...). Orchestration playbooks
/// use them as booleans, so a matcher written with one also matches the
/// boolean it stands for.
fn yaml11_bool(word: &str) -> Option<bool> {
    match word {
        "y" | "Y" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" | "true" | "True" | "TRUE" => {
            Some(true)
        }
        "n" | "N" | "no" | "No" | "NO" | "off" | "Off" | "OFF" | "false" | "False" | "FALSE" => {
            Some(false)
        }
        _ => None,
    }
}

fn has_non_finite(value: &YamlValue) -> bool {
    match value {
        YamlValue::Number(n) => n.as_f64().is_some_and(|f| !f.is_finite()),
        YamlValue::Sequence(items) => items.iter().any(has_non_finite),
        YamlValue::Mapping(m) => m.iter().any(|(k, v)| has_non_finite(k) || has_non_finite(v)),
        YamlValue::Tagged(tagged) => has_non_finite(&tagged.value),
        _ => false,
    }
}

fn key_string(key: &YamlValue, location: &str) -> Result<String, SchemaError> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        other => Err(SchemaError::new(
            location,
            format!("keys must be strings, found {}", kind_of(other)),
        )),
    }
}

fn kind_of(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(yaml: &str) -> PolicyDocument {
        PolicyDocument::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn scalar_operation_is_blocked() {
        let doc = parse("shell: ~\nraw: yes\nscript: 1\n");
        assert_eq!(doc.rule("shell"), Some(&OperationRule::Blocked));
        assert_eq!(doc.rule("raw"), Some(&OperationRule::Blocked));
        assert_eq!(doc.rule("script"), Some(&OperationRule::Blocked));
    }

    #[test]
    fn argument_rules_keep_document_order() {
        let doc = parse("copy:\n  src: blocked\n  dest: [/etc/passwd]\n  mode: [\"0777\"]\n");
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("copy") else {
            panic!("expected argument rules");
        };
        let names: Vec<&str> = args.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["src", "dest", "mode"]);
        assert_eq!(args[0].1, ArgumentRule::Blocked);
        assert_eq!(
            args[1].1,
            ArgumentRule::ValueRules(vec![ValueMatcher::Exact(json!("/etc/passwd"))])
        );
    }

    #[test]
    fn matchers_keep_document_order_and_parse_tags() {
        let doc = parse("command:\n  cmd:\n    - \"contains rm -rf\"\n    - reboot\n    - 3\n");
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("command") else {
            panic!("expected argument rules");
        };
        assert_eq!(
            args[0].1,
            ArgumentRule::ValueRules(vec![
                ValueMatcher::Contains("rm -rf".into()),
                ValueMatcher::Exact(json!("reboot")),
                ValueMatcher::Exact(json!(3)),
            ])
        );
    }

    #[test]
    fn mapping_under_argument_blocks_it() {
        let doc = parse("file:\n  state:\n    absent: true\n");
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("file") else {
            panic!("expected argument rules");
        };
        assert_eq!(args[0].1, ArgumentRule::Blocked);
    }

    #[test]
    fn empty_source_is_empty_policy() {
        assert!(parse("").is_empty());
        assert!(parse("{}").is_empty());
    }

    #[test]
    fn top_level_sequence_is_rejected() {
        let err = PolicyDocument::from_yaml_str("- shell\n- raw\n").unwrap_err();
        assert!(matches!(err, DocumentError::Schema(_)));
        assert!(err.to_string().contains("top level must be a mapping"));
    }

    #[test]
    fn top_level_scalar_is_rejected() {
        let err = PolicyDocument::from_yaml_str("just a string").unwrap_err();
        assert!(matches!(err, DocumentError::Schema(_)));
    }

    #[test]
    fn sequence_under_operation_is_rejected() {
        let err = PolicyDocument::from_yaml_str("copy:\n  - dest\n").unwrap_err();
        match err {
            DocumentError::Schema(schema) => assert_eq!(schema.location, "copy"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn non_string_operation_key_is_rejected() {
        let err = PolicyDocument::from_yaml_str("1: ~\n").unwrap_err();
        assert!(err.to_string().contains("keys must be strings"));
    }

    #[test]
    fn invalid_yaml_is_syntax_error() {
        let err = PolicyDocument::from_yaml_str("copy: [unterminated\n").unwrap_err();
        assert!(matches!(err, DocumentError::Syntax(_)));
    }

    #[test]
    fn duplicate_operation_is_rejected() {
        let err = PolicyDocument::from_yaml_str("shell: ~\nshell: ~\n").unwrap_err();
        assert!(matches!(err, DocumentError::Syntax(_)));
    }

    #[test]
    fn merge_keys_are_expanded() {
        let doc = parse(
            "common: &paths\n  dest: [/etc/passwd]\ncopy:\n  <<: *paths\n  mode: [\"0777\"]\n",
        );
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("copy") else {
            panic!("expected argument rules");
        };
        assert!(args.iter().all(|(name, _)| name != "<<"));
        let dest = args.iter().find(|(name, _)| name == "dest").map(|(_, r)| r);
        assert_eq!(
            dest,
            Some(&ArgumentRule::ValueRules(vec![ValueMatcher::Exact(json!(
                "/etc/passwd"
            ))]))
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for yaml in [
            "svc:\n  port: [.nan]\n",
            "svc:\n  port: [.inf]\n",
            "svc:\n  port: [[1, -.inf]]\n",
        ] {
            let err = PolicyDocument::from_yaml_str(yaml).unwrap_err();
            match err {
                DocumentError::Schema(schema) => assert_eq!(schema.location, "svc.port[0]"),
                other => panic!("expected schema error, got {:?}", other),
            }
        }
    }

    #[test]
    fn boolean_words_also_match_booleans() {
        let doc = parse("file:\n  recurse: [yes]\n  force: [\"off\"]\n");
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("file") else {
            panic!("expected argument rules");
        };
        assert_eq!(
            args[0].1,
            ArgumentRule::ValueRules(vec![
                ValueMatcher::Exact(json!("yes")),
                ValueMatcher::Exact(json!(true)),
            ])
        );
        assert_eq!(
            args[1].1,
            ArgumentRule::ValueRules(vec![
                ValueMatcher::Exact(json!("off")),
                ValueMatcher::Exact(json!(false)),
            ])
        );
    }

    #[test]
    fn tagged_entries_lose_their_tag() {
        let doc = parse("command:\n  cmd:\n    - !danger \"contains rm -rf\"\n    - !path /etc\n");
        let Some(OperationRule::ArgumentRules(args)) = doc.rule("command") else {
            panic!("expected argument rules");
        };
        assert_eq!(
            args[0].1,
            ArgumentRule::ValueRules(vec![
                ValueMatcher::Contains("rm -rf".into()),
                ValueMatcher::Exact(json!("/etc")),
            ])
        );
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let doc = parse("shell: ~\n");
        assert!(doc.rule("shell").is_some());
        assert!(doc.rule("Shell").is_none());
        assert!(doc.rule("shel").is_none());
    }

    #[test]
    fn introspection_counts() {
        let doc = parse("shell: ~\ncopy:\n  dest: [a, b]\n  src: [\"contains x\"]\n");
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.operations(), vec!["copy", "shell"]);
        assert_eq!(doc.matcher_count(), 3);
    }
}
