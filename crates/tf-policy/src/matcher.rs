// matcher.rs — Value matchers for argument rules.
//
// A policy lists, per argument, the values that must be rejected:
//
//   copy:
//     dest:
//       - /etc/passwd          # exact match
//       - "contains .ssh"      # substring match
//
// The "contains" tag is parsed once at load time into a structured
// matcher; evaluation never looks at the raw tag again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag marking a substring matcher in the policy file.
pub const CONTAINS_TAG: &str = "contains";

/// Character offset at which the substring payload starts: the tag plus
/// one separator character (`"contains rm -rf"` → `"rm -rf"`).
const CONTAINS_PAYLOAD_OFFSET: usize = CONTAINS_TAG.len() + 1;

/// Opening delimiter of an orchestration template expression.
const TEMPLATE_OPEN: &str = "{{";

/// A single comparison applied to one argument's runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMatcher {
    /// Matches when the argument's string form contains the payload.
    Contains(String),
    /// Matches when the argument equals the value, with no type coercion.
    Exact(Value),
}

impl ValueMatcher {
    /// Build a matcher from one entry of a policy value list.
    ///
    /// Only strings can carry the `contains` tag; every other entry
    /// (numbers, booleans, null, nested structures) is an exact match.
    pub fn from_entry(entry: Value) -> Self {
        match entry {
            Value::String(s) if s.starts_with(CONTAINS_TAG) => {
                ValueMatcher::Contains(s.chars().skip(CONTAINS_PAYLOAD_OFFSET).collect())
            }
            other => ValueMatcher::Exact(other),
        }
    }

    /// Test a runtime argument value against this matcher.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueMatcher::Contains(needle) => stringify(value).contains(needle.as_str()),
            ValueMatcher::Exact(expected) => value == expected,
        }
    }

    /// Short human-readable form used in traces and CLI output.
    pub fn describe(&self) -> String {
        match self {
            ValueMatcher::Contains(needle) => format!("contains '{}'", needle),
            ValueMatcher::Exact(value) => format!("== {}", value),
        }
    }
}

/// String form of a runtime value, as seen by `Contains` matchers.
///
/// Strings are used verbatim (no surrounding quotes); scalars use their
/// display form; arrays and objects are rendered as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Whether a runtime value still carries an unexpanded template expression.
pub fn has_template_marker(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.contains(TEMPLATE_OPEN))
}
