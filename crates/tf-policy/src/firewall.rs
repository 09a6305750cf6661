// firewall.rs — Dispatcher-facing gate.
//
// The orchestration engine builds one Firewall at startup and calls it
// before every unit of work. A denial must stop the work before any of its
// side effects happen; `guard()` makes that structural by only invoking the
// work closure after the check passes.
//
// What happens to the rest of a run after a denial is the dispatcher's
// choice, expressed as a DenialAction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::RuntimeAction;
use crate::error::{PolicyDenied, PolicyLoadError};
use crate::evaluator::{EvaluationSink, EvaluationTrace, PolicyEvaluator};
use crate::store::{PolicyStore, DEFAULT_POLICY_PATH};

/// What the dispatcher does with the remaining work after a denial.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialAction {
    /// Stop the whole run at the first denial.
    #[default]
    Abort,
    /// Skip the denied unit of work and continue with the next.
    Skip,
}

impl std::fmt::Display for DenialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialAction::Abort => write!(f, "abort"),
            DenialAction::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for DenialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(DenialAction::Abort),
            "skip" => Ok(DenialAction::Skip),
            other => Err(format!(
                "unknown denial action '{}' (expected 'abort' or 'skip')",
                other
            )),
        }
    }
}

/// Configuration for a [`Firewall`].
///
/// Built in code only; the policy path defaults to [`DEFAULT_POLICY_PATH`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallConfig {
    /// Policy file to load.
    pub policy_path: PathBuf,
    /// Behavior of `check_batch()` after a denial.
    pub on_deny: DenialAction,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            policy_path: PathBuf::from(DEFAULT_POLICY_PATH),
            on_deny: DenialAction::default(),
        }
    }
}

impl FirewallConfig {
    /// Config pointing at an explicit policy file.
    pub fn with_policy_path(path: impl AsRef<Path>) -> Self {
        Self {
            policy_path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn on_deny(mut self, action: DenialAction) -> Self {
        self.on_deny = action;
        self
    }
}

/// Result of evaluating a sequence of actions under a [`DenialAction`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Indices of actions that passed the firewall.
    pub allowed: Vec<usize>,
    /// Index and denial for every rejected action that was evaluated.
    pub denied: Vec<(usize, PolicyDenied)>,
    /// Number of actions never evaluated because the run was aborted.
    pub not_evaluated: usize,
    /// Whether evaluation stopped early.
    pub aborted: bool,
}

impl BatchOutcome {
    /// Whether every action was allowed.
    pub fn all_allowed(&self) -> bool {
        self.denied.is_empty() && !self.aborted
    }
}

/// A loaded policy plus an evaluator: the single check the dispatcher calls.
#[derive(Clone)]
pub struct Firewall {
    store: Arc<PolicyStore>,
    evaluator: PolicyEvaluator,
    on_deny: DenialAction,
}

impl Firewall {
    /// Load the configured policy. Fails only on a malformed policy.
    pub fn open(config: &FirewallConfig) -> Result<Self, PolicyLoadError> {
        let store = PolicyStore::load(&config.policy_path)?;
        Ok(Self::from_store(store, config.on_deny))
    }

    /// Build from an already-loaded store.
    pub fn from_store(store: PolicyStore, on_deny: DenialAction) -> Self {
        Self {
            store: Arc::new(store),
            evaluator: PolicyEvaluator::new(),
            on_deny,
        }
    }

    /// Replace the evaluation sink (audit log, test collector, ...).
    pub fn with_sink(mut self, sink: Arc<dyn EvaluationSink>) -> Self {
        self.evaluator = PolicyEvaluator::with_sink(sink);
        self
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn on_deny(&self) -> DenialAction {
        self.on_deny
    }

    /// Check one action. `Err` means the dispatcher must not run it.
    pub fn check(&self, action: &RuntimeAction) -> Result<(), PolicyDenied> {
        self.evaluator.evaluate(action, self.store.document())
    }

    /// Check one action and return the full evaluation trace.
    pub fn explain(&self, action: &RuntimeAction) -> EvaluationTrace {
        self.evaluator
            .evaluate_with_trace(action, self.store.document())
    }

    /// Run `work` only if `action` passes the firewall.
    pub fn guard<T>(
        &self,
        action: &RuntimeAction,
        work: impl FnOnce() -> T,
    ) -> Result<T, PolicyDenied> {
        self.check(action)?;
        Ok(work())
    }

    /// Check a sequence of actions, honoring the configured [`DenialAction`].
    pub fn check_batch<'a, I>(&self, actions: I) -> BatchOutcome
    where
        I: IntoIterator<Item = &'a RuntimeAction>,
    {
        let mut outcome = BatchOutcome::default();
        let mut actions = actions.into_iter().enumerate();

        for (i, action) in actions.by_ref() {
            match self.check(action) {
                Ok(()) => outcome.allowed.push(i),
                Err(denied) => {
                    outcome.denied.push((i, denied));
                    if self.on_deny == DenialAction::Abort {
                        outcome.aborted = true;
                        break;
                    }
                }
            }
        }

        outcome.not_evaluated = actions.count();
        if outcome.aborted {
            tracing::info!(
                not_evaluated = outcome.not_evaluated,
                "run aborted by firewall denial"
            );
        }
        outcome
    }
}
