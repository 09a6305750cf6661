// error.rs — Error types for the firewall policy subsystem.
//
// Two failures leave this crate:
// - PolicyLoadError: the policy file exists but is not a valid policy.
//   Always fatal; a broken policy must never be treated as "no policy".
// - PolicyDenied: a guarded action matched a rule and must not run.
//
// A missing policy file is not an error at all (see store.rs).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a policy document.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    /// The file is not valid YAML.
    #[error("policy {path} is malformed: {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The YAML parsed but does not have the policy shape.
    #[error("policy {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl PolicyLoadError {
    /// The policy file the error refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            PolicyLoadError::Syntax { path, .. } | PolicyLoadError::Malformed { path, .. } => path,
        }
    }
}

/// A structural problem found while decoding a YAML tree into a
/// [`PolicyDocument`](crate::PolicyDocument).
///
/// Carries the dotted location of the offending node so the operator can
/// find it; the store attaches the file path when converting this into a
/// [`PolicyLoadError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at '{location}': {message}")]
pub struct SchemaError {
    pub location: String,
    pub message: String,
}

impl SchemaError {
    pub(crate) fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Which rule fired to deny an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DeniedRule {
    /// The whole operation is blocked.
    OperationBlocked,
    /// The argument is blocked whenever present.
    ArgumentBlocked,
    /// The argument's string form contains this substring.
    Contains(String),
    /// The argument equals this value.
    Exact(serde_json::Value),
}

impl fmt::Display for DeniedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeniedRule::OperationBlocked => write!(f, "operation blocked"),
            DeniedRule::ArgumentBlocked => write!(f, "argument blocked"),
            DeniedRule::Contains(needle) => write!(f, "contains '{}'", needle),
            DeniedRule::Exact(value) => write!(f, "value {}", value),
        }
    }
}

/// An action was rejected by the firewall policy.
///
/// The rendered message names the operation, the argument (when the rule
/// is argument-scoped) and the rule itself, so it can go straight into an
/// audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDenied {
    pub operation: String,
    pub argument: Option<String>,
    pub rule: DeniedRule,
}

impl fmt::Display for PolicyDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.argument, &self.rule) {
            (None, _) => write!(f, "firewall policy: operation '{}' blocked", self.operation),
            (Some(arg), DeniedRule::ArgumentBlocked) => write!(
                f,
                "firewall policy: operation '{}' argument '{}' blocked",
                self.operation, arg
            ),
            (Some(arg), rule) => write!(
                f,
                "firewall policy: operation '{}' argument '{}' blocked ({})",
                self.operation, arg, rule
            ),
        }
    }
}

impl std::error::Error for PolicyDenied {}

impl PolicyDenied {
    pub(crate) fn operation(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            argument: None,
            rule: DeniedRule::OperationBlocked,
        }
    }

    pub(crate) fn argument(operation: &str, argument: &str, rule: DeniedRule) -> Self {
        Self {
            operation: operation.to_string(),
            argument: Some(argument.to_string()),
            rule,
        }
    }
}
