// action.rs — The unit of work submitted to the firewall.
//
// The dispatcher owns actions; the firewall only reads them for the
// duration of one evaluation. Argument values use the JSON value model so
// strings, numbers, booleans and nested structures stay distinct types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An operation about to be dispatched, with its named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeAction {
    /// The operation (module/command) identifier, e.g. "copy".
    pub operation: String,
    /// Argument name → runtime value.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl RuntimeAction {
    /// Create an action with no arguments.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            arguments: Map::new(),
        }
    }

    /// Builder-style argument insertion.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_heterogeneous_arguments() {
        let action = RuntimeAction::new("copy")
            .with_arg("dest", "/tmp/x")
            .with_arg("force", true)
            .with_arg("mode", 420);
        assert_eq!(action.operation, "copy");
        assert_eq!(action.argument("dest"), Some(&json!("/tmp/x")));
        assert_eq!(action.argument("force"), Some(&json!(true)));
        assert_eq!(action.argument("mode"), Some(&json!(420)));
        assert_eq!(action.argument("src"), None);
    }

    #[test]
    fn deserializes_without_arguments() {
        let action: RuntimeAction = serde_json::from_str(r#"{"operation":"ping"}"#).unwrap();
        assert!(action.arguments.is_empty());
    }
}
