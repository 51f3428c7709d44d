//! Run reports
//!
//! Each module writes its [`ModuleReport`] exactly once, when its task
//! finishes. The [`RunReport`] collects them after every task has ended.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gantry_capability::BindOutcome;
use gantry_gates::{GateFailure, GateOutcome};
use gantry_graph::{LifecycleState, ModuleId};
use serde::Serialize;
use uuid::Uuid;

use crate::collaborators::{Artifact, PublishReceipt};
use crate::error::ModuleError;

/// Final record of one module in a run
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: ModuleId,
    /// Last state the module reached
    pub terminal_state: LifecycleState,
    pub bindings: Vec<BindOutcome>,
    /// Every gate evaluated for the module, passed or not
    pub gates: Vec<GateOutcome>,
    /// Advisory gate failures
    pub warnings: Vec<GateFailure>,
    pub errors: Vec<ModuleError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<PublishReceipt>,
}

impl ModuleReport {
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            terminal_state: LifecycleState::Declared,
            bindings: Vec::new(),
            gates: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            artifact: None,
            receipt: None,
        }
    }

    /// Report for a module whose task never reported back
    pub fn aborted(module: ModuleId, reason: impl Into<String>) -> Self {
        let mut report = Self::new(module);
        report.errors.push(ModuleError::Aborted {
            reason: reason.into(),
        });
        report
    }

    pub fn is_published(&self) -> bool {
        self.terminal_state == LifecycleState::Published
    }

    /// Blocking gate failures, exhausted timeouts included
    pub fn blocking_failures(&self) -> Vec<GateFailure> {
        self.errors.iter().flat_map(ModuleError::gate_failures).collect()
    }

    /// Whether the module reached `Published` without errors
    pub fn succeeded(&self) -> bool {
        self.is_published() && self.errors.is_empty()
    }
}

/// Aggregated result of one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub modules: BTreeMap<ModuleId, ModuleReport>,
    /// True when every module reached `Published` with no errors
    pub success: bool,
}

impl RunReport {
    /// Close a run started at `started_at`
    pub fn finish(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        modules: BTreeMap<ModuleId, ModuleReport>,
    ) -> Self {
        let success = modules.values().all(ModuleReport::succeeded);
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            modules,
            success,
        }
    }

    pub fn module(&self, id: &str) -> Option<&ModuleReport> {
        self.modules.get(id)
    }

    /// Terminal state of a module, if it was part of the run
    pub fn state_of(&self, id: &str) -> Option<LifecycleState> {
        self.module(id).map(|report| report.terminal_state)
    }

    /// Modules that did not succeed
    pub fn failed_modules(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules.values().filter(|report| !report.succeeded())
    }

    /// Number of modules per terminal state
    pub fn state_counts(&self) -> BTreeMap<LifecycleState, usize> {
        let mut counts = BTreeMap::new();
        for report in self.modules.values() {
            *counts.entry(report.terminal_state).or_insert(0) += 1;
        }
        counts
    }
}
