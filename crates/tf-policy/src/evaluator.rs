// evaluator.rs — Policy evaluation engine.
//
// Every unit of work passes through `evaluate()` before it is dispatched:
//
// 1. Is there a rule for the operation? → No → Allow (default allow)
// 2. Is the operation blocked outright? → Yes → Deny
// 3. For each argument rule, in document order:
//    a. argument absent from the action → skip
//    b. argument blocked → Deny
//    c. matchers in order; the first that matches → Deny
// 4. Nothing matched → Allow
//
// The policy only encodes what is forbidden. Evaluation is a pure read of
// the document and the action, so one evaluator can serve any number of
// dispatch threads without locking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::RuntimeAction;
use crate::document::{ArgumentRule, OperationRule, PolicyDocument};
use crate::error::{DeniedRule, PolicyDenied};
use crate::matcher::{self, ValueMatcher};

/// The result of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action must not run.
    Deny { reason: String },
}

/// One check performed while walking the policy.
///
/// Captures what the evaluator looked at so the decision trail is fully
/// observable for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationStep {
    /// Which check was performed (e.g., "operation_lookup", "matcher").
    pub check: String,
    /// The outcome of this check (e.g., "passed", "matched: contains 'rm'").
    pub outcome: String,
    /// Whether this step decided the evaluation.
    pub terminal: bool,
}

impl EvaluationStep {
    fn new(check: impl Into<String>, outcome: impl Into<String>, terminal: bool) -> Self {
        Self {
            check: check.into(),
            outcome: outcome.into(),
            terminal,
        }
    }
}

/// Full evaluation record returned by [`PolicyEvaluator::evaluate_with_trace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    /// The final decision.
    pub decision: Decision,
    /// The structured denial, when denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial: Option<PolicyDenied>,
    /// Ordered steps the evaluator performed.
    pub steps: Vec<EvaluationStep>,
}

/// Receives every evaluation step as it happens.
///
/// Injected into the evaluator so callers choose where the audit trail goes
/// (a tracing subscriber, a test collector, an audit log).
pub trait EvaluationSink: Send + Sync {
    fn record(&self, action: &RuntimeAction, step: &EvaluationStep);
}

/// Default sink: emits each step as a `trace`-level tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EvaluationSink for TracingSink {
    fn record(&self, action: &RuntimeAction, step: &EvaluationStep) {
        tracing::trace!(
            operation = %action.operation,
            check = %step.check,
            outcome = %step.outcome,
            terminal = step.terminal,
            "firewall rule checked"
        );
    }
}

/// Sink that discards every step.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EvaluationSink for NullSink {
    fn record(&self, _action: &RuntimeAction, _step: &EvaluationStep) {}
}

/// The policy evaluator — decides Allow or Deny for a runtime action.
#[derive(Clone)]
pub struct PolicyEvaluator {
    sink: Arc<dyn EvaluationSink>,
}

impl PolicyEvaluator {
    /// Create an evaluator that reports steps through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create an evaluator that reports steps to the given sink.
    pub fn with_sink(sink: Arc<dyn EvaluationSink>) -> Self {
        Self { sink }
    }

    /// Evaluate an action against a policy document.
    ///
    /// This is the single chokepoint: `Ok(())` means the dispatcher may run
    /// the unit of work, `Err` means it must not.
    pub fn evaluate(
        &self,
        action: &RuntimeAction,
        document: &PolicyDocument,
    ) -> Result<(), PolicyDenied> {
        let result = walk(action, document, &mut |step| self.sink.record(action, &step));
        if let Err(denied) = &result {
            tracing::warn!(
                operation = %denied.operation,
                argument = denied.argument.as_deref().unwrap_or("-"),
                rule = %denied.rule,
                "action denied by firewall policy"
            );
        }
        result
    }

    /// Evaluate an action and return the decision with every step taken.
    ///
    /// Same walk as `evaluate()`; steps are collected instead of (not in
    /// addition to) being sent to the sink.
    pub fn evaluate_with_trace(
        &self,
        action: &RuntimeAction,
        document: &PolicyDocument,
    ) -> EvaluationTrace {
        let mut steps = Vec::new();
        let result = walk(action, document, &mut |step| steps.push(step));
        match result {
            Ok(()) => EvaluationTrace {
                decision: Decision::Allow,
                denial: None,
                steps,
            },
            Err(denied) => EvaluationTrace {
                decision: Decision::Deny {
                    reason: denied.to_string(),
                },
                denial: Some(denied),
                steps,
            },
        }
    }
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the document for one action, reporting each check to `record`.
///
/// Returns at the first rule that fires; nothing after it is examined.
fn walk(
    action: &RuntimeAction,
    document: &PolicyDocument,
    record: &mut dyn FnMut(EvaluationStep),
) -> Result<(), PolicyDenied> {
    let operation = action.operation.as_str();

    let args = match document.rule(operation) {
        None => {
            record(EvaluationStep::new(
                "operation_lookup",
                format!("no rule for '{}'; allowed", operation),
                true,
            ));
            return Ok(());
        }
        Some(OperationRule::Blocked) => {
            record(EvaluationStep::new(
                "operation_lookup",
                format!("operation '{}' blocked", operation),
                true,
            ));
            return Err(PolicyDenied::operation(operation));
        }
        Some(OperationRule::ArgumentRules(args)) => {
            record(EvaluationStep::new(
                "operation_lookup",
                format!("found: {} argument rule(s)", args.len()),
                false,
            ));
            args
        }
    };

    for (name, rule) in args {
        let check = format!("argument:{}", name);
        let Some(value) = action.argument(name) else {
            record(EvaluationStep::new(check, "absent; skipped", false));
            continue;
        };

        let matchers = match rule {
            ArgumentRule::Blocked => {
                record(EvaluationStep::new(check, "argument blocked", true));
                return Err(PolicyDenied::argument(
                    operation,
                    name,
                    DeniedRule::ArgumentBlocked,
                ));
            }
            ArgumentRule::ValueRules(matchers) => matchers,
        };

        if matcher::has_template_marker(value) {
            record(EvaluationStep::new(
                "unresolved_template",
                format!("argument '{}' matched as literal: {}", name, value),
                false,
            ));
        }

        for (i, m) in matchers.iter().enumerate() {
            let check = format!("matcher:{}[{}]", name, i);
            if m.matches(value) {
                record(EvaluationStep::new(
                    check,
                    format!("matched {} against {}", m.describe(), value),
                    true,
                ));
                return Err(PolicyDenied::argument(operation, name, denied_rule(m)));
            }
            record(EvaluationStep::new(
                check,
                format!("passed {} against {}", m.describe(), value),
                false,
            ));
        }
    }

    record(EvaluationStep::new(
        "argument_rules",
        "no rule matched; allowed",
        true,
    ));
    Ok(())
}

fn denied_rule(m: &ValueMatcher) -> DeniedRule {
    match m {
        ValueMatcher::Contains(needle) => DeniedRule::Contains(needle.clone()),
        ValueMatcher::Exact(value) => DeniedRule::Exact(value.clone()),
    }
}
