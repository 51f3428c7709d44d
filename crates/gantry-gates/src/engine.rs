//! Lifecycle state machine with gated transitions
//!
//! Every module walks `Declared -> Configured -> Built -> Verified ->
//! Published`, one step at a time. Before a step, every in-scope gate
//! guarding that step is evaluated: blocking failures stop the step,
//! advisory failures are only reported.

use gantry_graph::{LifecycleState, ModuleId, Transition};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gate::{Gate, GateContext, Severity};

/// Lifecycle position of one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLifecycle {
    module: ModuleId,
    state: LifecycleState,
}

impl ModuleLifecycle {
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            state: LifecycleState::Declared,
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }
}

/// A failed gate and why it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    pub gate: String,
    pub reason: String,
}

/// Record of one gate evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: String,
    pub transition: Transition,
    pub severity: Severity,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of evaluating the gates on one transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCheck {
    pub transition: Transition,
    pub outcomes: Vec<GateOutcome>,
    /// Blocking gates that failed
    pub failures: Vec<GateFailure>,
    /// Advisory gates that failed
    pub warnings: Vec<GateFailure>,
}

impl TransitionCheck {
    fn new(transition: Transition) -> Self {
        Self {
            transition,
            outcomes: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether no blocking gate failed
    pub fn allowed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Evaluates gates and moves module lifecycles forward
#[derive(Debug, Clone, Default)]
pub struct GateEngine {
    gates: Vec<Gate>,
}

impl GateEngine {
    /// Create an engine, validating every gate.
    pub fn new(gates: Vec<Gate>) -> Result<Self> {
        for gate in &gates {
            gate.validate()?;
        }
        Ok(Self { gates })
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Gates declared on a transition, regardless of scope
    pub fn gates_on(&self, transition: Transition) -> impl Iterator<Item = &Gate> {
        self.gates.iter().filter(move |g| g.transition == transition)
    }

    /// Evaluate every in-scope gate guarding `current -> target`.
    ///
    /// Never mutates the lifecycle. A step that skips a state has no gates
    /// and yields an empty check; [`GateEngine::advance`] refuses it.
    pub fn can_transition(
        &self,
        lifecycle: &ModuleLifecycle,
        target: LifecycleState,
        ctx: &GateContext<'_>,
    ) -> TransitionCheck {
        let transition = Transition::new(lifecycle.state, target);
        let mut check = TransitionCheck::new(transition);

        for gate in self.gates_on(transition) {
            if !gate.applies_to(ctx.module, ctx.bound) {
                continue;
            }
            let result = gate.evaluate(ctx);
            let reason = result.err();
            if let Some(reason) = &reason {
                let failure = GateFailure {
                    gate: gate.name.clone(),
                    reason: reason.clone(),
                };
                match gate.severity {
                    Severity::Blocking => {
                        tracing::debug!(module = %lifecycle.module, gate = %gate.name, %reason, "Blocking gate failed");
                        check.failures.push(failure);
                    }
                    Severity::Advisory => {
                        tracing::warn!(module = %lifecycle.module, gate = %gate.name, %reason, "Advisory gate failed");
                        check.warnings.push(failure);
                    }
                }
            }
            check.outcomes.push(GateOutcome {
                gate: gate.name.clone(),
                transition,
                severity: gate.severity,
                passed: reason.is_none(),
                reason,
            });
        }
        check
    }

    /// Move the lifecycle one step forward to `target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalTransition` if `target` is not the immediate
    /// successor of the current state and `Error::GateBlocked` with every
    /// blocking failure if any blocking gate failed. The state is unchanged
    /// on error.
    pub fn advance(
        &self,
        lifecycle: &mut ModuleLifecycle,
        target: LifecycleState,
        ctx: &GateContext<'_>,
    ) -> Result<TransitionCheck> {
        let check = self.can_transition(lifecycle, target, ctx);
        self.apply(lifecycle, check)
    }

    /// Move the lifecycle along an already evaluated check.
    ///
    /// Lets callers record every outcome of `check` before the step is
    /// taken or refused. Fails the same way as [`GateEngine::advance`].
    pub fn apply(
        &self,
        lifecycle: &mut ModuleLifecycle,
        check: TransitionCheck,
    ) -> Result<TransitionCheck> {
        let transition = check.transition;
        if transition.from != lifecycle.state || !transition.is_forward_step() {
            return Err(Error::IllegalTransition {
                module: lifecycle.module.clone(),
                from: lifecycle.state,
                to: transition.to,
            });
        }
        if !check.allowed() {
            return Err(Error::GateBlocked {
                module: lifecycle.module.clone(),
                transition,
                failures: check.failures,
            });
        }

        tracing::info!(module = %lifecycle.module, from = %lifecycle.state, to = %transition.to, "Advanced");
        lifecycle.state = transition.to;
        Ok(check)
    }
}
