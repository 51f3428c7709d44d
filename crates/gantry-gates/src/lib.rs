//! Gates for Gantry
//!
//! This crate guards module lifecycle transitions and version-control events:
//!
//! - [`Gate`]s declare a check (coverage threshold, tests passed, named
//!   metric) on one lifecycle step, with blocking or advisory severity.
//! - [`GateEngine`] evaluates the gates on a step and moves a
//!   [`ModuleLifecycle`] forward only when no blocking gate failed.
//! - [`GitHooks`] installs and runs git hook scripts, and
//!   [`validate_commit_message`] checks conventional commit messages.

pub mod commit;
pub mod engine;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod metrics;

pub use commit::{CommitHeader, parse_header, validate_commit_message};
pub use engine::{GateEngine, GateFailure, GateOutcome, ModuleLifecycle, TransitionCheck};
pub use error::{Error, Result};
pub use gate::{Gate, GateCheck, GateContext, Severity};
pub use hooks::{GitHooks, HookName, HookRun};
pub use metrics::{Counter, CounterKind, CoverageMetrics, PackageCoverage, TestCounts};
