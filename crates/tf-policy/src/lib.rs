//! # tf-policy
//!
//! Policy-based admission filter for orchestration engines.
//!
//! Before a dispatcher runs a unit of work (an operation plus its named
//! arguments) it asks the [`Firewall`] whether the action is allowed. The
//! [`PolicyStore`] loads a YAML document listing what is forbidden; the
//! [`PolicyEvaluator`] walks it for each action.
//!
//! ## Key invariants
//!
//! - **Default allow**: an operation or argument absent from the policy is
//!   permitted. The policy only encodes what is forbidden.
//! - **First match wins**: argument rules and value matchers are checked in
//!   document order; evaluation stops at the first rule that fires.
//! - **Fail closed on a broken policy**: a malformed policy file is a fatal
//!   [`PolicyLoadError`]. Only a missing file yields the empty policy.
//! - **Read-only evaluation**: the document is immutable after load, so one
//!   firewall can serve any number of dispatch threads.

pub mod action;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod firewall;
pub mod matcher;
pub mod store;

pub use action::RuntimeAction;
pub use document::{ArgumentRule, DocumentError, OperationRule, PolicyDocument};
pub use error::{DeniedRule, PolicyDenied, PolicyLoadError, SchemaError};
pub use evaluator::{
    Decision, EvaluationSink, EvaluationStep, EvaluationTrace, NullSink, PolicyEvaluator,
    TracingSink,
};
pub use firewall::{BatchOutcome, DenialAction, Firewall, FirewallConfig};
pub use matcher::ValueMatcher;
pub use store::{PolicySource, PolicyStore, DEFAULT_POLICY_PATH};
