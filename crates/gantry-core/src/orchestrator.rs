//! Orchestration driver
//!
//! One task per module walks it through `Declared -> Configured -> Built ->
//! Verified -> Published`. Tasks coordinate only through per-module progress
//! watches: a module waits for its dependencies to reach `Built` before
//! compiling and for them to finish before publishing. A semaphore bounds how
//! many modules do work at once; it is never held while waiting on another
//! module.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use gantry_capability::{Binding, CapabilityKind};
use gantry_config::{EffectiveConfig, RunSettings};
use gantry_gates::{CoverageMetrics, GateContext, HookName, ModuleLifecycle};
use gantry_graph::{LifecycleState, Module, ModuleId, Transition};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collaborators::{Collaborators, ModuleContext};
use crate::declarations::Declarations;
use crate::error::{Error, ModuleError, Result};
use crate::plan::Plan;
use crate::report::{ModuleReport, RunReport};
use crate::retry::{CallFailure, RetryPolicy, call_with_retry};

/// What dependants can observe about a module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    state: LifecycleState,
    /// No further progress will happen
    finalized: bool,
}

/// State shared by every module task of one run
struct RunShared {
    plan: Plan,
    settings: RunSettings,
    collaborators: Collaborators,
    workspace_root: PathBuf,
    progress: BTreeMap<ModuleId, watch::Sender<Progress>>,
    permits: Semaphore,
    reports: Mutex<BTreeMap<ModuleId, ModuleReport>>,
    cancel: CancellationToken,
}

/// Drives modules through their lifecycle
#[derive(Debug)]
pub struct Orchestrator {
    collaborators: Collaborators,
    settings: RunSettings,
    workspace_root: PathBuf,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, settings: RunSettings) -> Self {
        Self {
            collaborators,
            settings,
            workspace_root: PathBuf::from("."),
            cancel: CancellationToken::new(),
        }
    }

    /// Directory module paths are resolved against
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Token that cancels every in-flight module when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every declared module as far through its lifecycle as it goes.
    ///
    /// # Errors
    ///
    /// Only structural problems (invalid settings, graph, capability or gate
    /// errors) are returned; module failures are recorded in the report.
    pub async fn run(&self, declarations: &Declarations) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        self.settings.validate()?;
        let plan = Plan::build(declarations, self.settings.inherit)?;
        tracing::info!(%run_id, modules = plan.order().len(), max_parallel = self.settings.max_parallel, "Starting run");

        let progress = plan
            .order()
            .iter()
            .map(|id| (id.clone(), watch::channel(Progress::default()).0))
            .collect();
        let order = plan.order().to_vec();
        let shared = Arc::new(RunShared {
            plan,
            settings: self.settings.clone(),
            collaborators: self.collaborators.clone(),
            workspace_root: self.workspace_root.clone(),
            progress,
            permits: Semaphore::new(self.settings.max_parallel),
            reports: Mutex::new(BTreeMap::new()),
            cancel: self.cancel.child_token(),
        });

        let mut tasks = JoinSet::new();
        for id in &order {
            tasks.spawn(drive_module(shared.clone(), id.clone()));
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "Module task ended abnormally");
            }
        }

        let mut modules = std::mem::take(&mut *shared.reports.lock().await);
        for id in order {
            modules
                .entry(id.clone())
                .or_insert_with(|| ModuleReport::aborted(id, "module task ended without a report"));
        }

        let report = RunReport::finish(run_id, started_at, modules);
        tracing::info!(%run_id, success = report.success, "Run finished");
        Ok(report)
    }

    /// Install every hook declared in the `[hooks]` table.
    ///
    /// Returns the hooks installed, in name order.
    pub async fn install_hooks(&self, declarations: &Declarations) -> Result<Vec<HookName>> {
        let hooks = self.collaborators.hooks.as_ref().ok_or(Error::NoHooks)?;
        let mut installed = Vec::new();
        for (hook, command) in declarations.hook_commands()? {
            hooks.install_hook(hook, &command).await?;
            installed.push(hook);
        }
        Ok(installed)
    }

    /// Run one installed hook through the hook collaborator
    pub async fn run_hook(&self, hook: HookName) -> Result<()> {
        let hooks = self.collaborators.hooks.as_ref().ok_or(Error::NoHooks)?;
        hooks.run_hook(hook).await?;
        Ok(())
    }
}

/// Run `declarations` with settings taken from their `[settings]` table.
pub async fn run(declarations: &Declarations, collaborators: Collaborators) -> Result<RunReport> {
    let mut settings = RunSettings::default();
    settings.apply(&declarations.settings);
    Orchestrator::new(collaborators, settings)
        .run(declarations)
        .await
}

/// Marks a module's progress final when its task ends, even by panic
struct FinalizeOnDrop<'a> {
    sender: Option<&'a watch::Sender<Progress>>,
}

impl Drop for FinalizeOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender {
            sender.send_modify(|progress| progress.finalized = true);
        }
    }
}

async fn drive_module(shared: Arc<RunShared>, id: ModuleId) {
    let _finalize = FinalizeOnDrop {
        sender: shared.progress.get(&id),
    };

    let module = match shared.plan.module(id.as_str()) {
        Ok(module) => module,
        Err(err) => {
            let report = ModuleReport::aborted(id.clone(), err.to_string());
            shared.reports.lock().await.insert(id, report);
            return;
        }
    };

    let mut driver = ModuleDriver::new(&shared, module);
    if let Err(err) = driver.run().await {
        tracing::error!(module = %id, error = %err, "Module halted");
        driver.report.errors.push(err);
    }
    driver.report.terminal_state = driver.lifecycle.state();
    let report = driver.report;
    shared.reports.lock().await.insert(id, report);
}

/// Per-module state while its task runs
struct ModuleDriver<'a> {
    shared: &'a RunShared,
    module: &'a Module,
    dependencies: BTreeSet<ModuleId>,
    lifecycle: ModuleLifecycle,
    report: ModuleReport,
    bindings: Vec<Binding>,
    bound: BTreeSet<String>,
    config: EffectiveConfig,
    context: Option<ModuleContext>,
    metrics: Option<CoverageMetrics>,
}

impl<'a> ModuleDriver<'a> {
    fn new(shared: &'a RunShared, module: &'a Module) -> Self {
        Self {
            shared,
            module,
            dependencies: module.edges().cloned().collect(),
            lifecycle: ModuleLifecycle::new(module.id.clone()),
            report: ModuleReport::new(module.id.clone()),
            bindings: Vec::new(),
            bound: BTreeSet::new(),
            config: EffectiveConfig::new(),
            context: None,
            metrics: None,
        }
    }

    async fn run(&mut self) -> std::result::Result<(), ModuleError> {
        self.configure().await?;
        self.build().await?;
        self.verify().await?;
        self.publish().await
    }

    async fn configure(&mut self) -> std::result::Result<(), ModuleError> {
        let _permit = self.permit().await?;
        let configured =
            self.shared
                .plan
                .configure(self.module)
                .map_err(|err| ModuleError::Configuration {
                    reason: err.to_string(),
                })?;

        self.report.bindings = configured.outcomes;
        self.bound = configured
            .bindings
            .iter()
            .map(|binding| binding.name().to_string())
            .collect();
        self.bindings = configured.bindings;
        self.config = configured.config;
        let ctx = ModuleContext::new(
            self.module.id.clone(),
            self.module.kind,
            &self.shared.workspace_root,
            self.module.source_dir(),
            self.config.clone(),
        );

        let instrumenter = &self.shared.collaborators.instrumenter;
        let bind_time = self.bindings.iter().filter(|binding| binding.kind().runs_at_bind());
        for binding in bind_time {
            call_with_retry(self.capability_policy(), &self.shared.cancel, binding.name(), || {
                instrumenter.instrument(&ctx, binding)
            })
            .await
            .map_err(|failure| {
                self.call_failed(failure, binding.name(), |reason| ModuleError::Instrumentation {
                    capability: binding.name().to_string(),
                    reason,
                })
            })?;
        }

        self.context = Some(ctx);
        self.advance(LifecycleState::Configured)
    }

    async fn build(&mut self) -> std::result::Result<(), ModuleError> {
        self.wait_for_dependencies(LifecycleState::Built, false).await?;
        let _permit = self.permit().await?;

        let compile = self.bindings_of(CapabilityKind::Compile).next().cloned();
        if let Some(binding) = compile {
            let ctx = self.context()?;
            let build = &self.shared.collaborators.build;
            let artifact = call_with_retry(
                self.capability_policy(),
                &self.shared.cancel,
                binding.name(),
                || build.compile(ctx),
            )
            .await
            .map_err(|failure| {
                self.call_failed(failure, binding.name(), |reason| ModuleError::Build { reason })
            })?;
            tracing::debug!(module = %self.module.id, path = ?artifact.path, "Built artifact");
            self.report.artifact = Some(artifact);
        }

        self.advance(LifecycleState::Built)
    }

    async fn verify(&mut self) -> std::result::Result<(), ModuleError> {
        let _permit = self.permit().await?;

        if self.bindings_of(CapabilityKind::Test).next().is_some() {
            let ctx = self.context()?;
            let tests = &self.shared.collaborators.tests;
            let policy = RetryPolicy::gate(&self.shared.settings);
            let metrics = call_with_retry(policy, &self.shared.cancel, "run_tests", || {
                tests.run_tests(ctx)
            })
            .await
            .map_err(|failure| match failure {
                CallFailure::TimedOut { attempts } => ModuleError::GateTimeout {
                    transition: Transition::new(LifecycleState::Built, LifecycleState::Verified),
                    attempts,
                },
                CallFailure::Cancelled => self.cancelled(),
                CallFailure::Failed(err) => ModuleError::Test {
                    reason: err.to_string(),
                },
            })?;
            self.metrics = Some(metrics);
        }

        self.advance(LifecycleState::Verified)
    }

    async fn publish(&mut self) -> std::result::Result<(), ModuleError> {
        self.wait_for_dependencies(LifecycleState::Published, true).await?;
        let _permit = self.permit().await?;

        let publish = self.bindings_of(CapabilityKind::Publish).next().cloned();
        if let Some(binding) = publish {
            match &self.report.artifact {
                Some(artifact) => {
                    let ctx = self.context()?;
                    let publisher = &self.shared.collaborators.publisher;
                    let receipt = call_with_retry(
                        self.capability_policy(),
                        &self.shared.cancel,
                        binding.name(),
                        || publisher.publish(ctx, artifact),
                    )
                    .await
                    .map_err(|failure| {
                        self.call_failed(failure, binding.name(), |reason| ModuleError::Publish {
                            reason,
                        })
                    })?;
                    tracing::debug!(module = %self.module.id, location = %receipt.location, "Published artifact");
                    self.report.receipt = Some(receipt);
                }
                None => {
                    tracing::debug!(module = %self.module.id, "No artifact to publish");
                }
            }
        }

        self.advance(LifecycleState::Published)
    }

    /// Evaluate the gates on the next step and take it if none blocks
    fn advance(&mut self, target: LifecycleState) -> std::result::Result<(), ModuleError> {
        if self.shared.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        let engine = self.shared.plan.engine();
        let ctx = GateContext {
            module: self.module,
            config: &self.config,
            bound: &self.bound,
            metrics: self.metrics.as_ref(),
        };
        let check = engine.can_transition(&self.lifecycle, target, &ctx);
        self.report.gates.extend(check.outcomes.iter().cloned());
        self.report.warnings.extend(check.warnings.iter().cloned());

        match engine.apply(&mut self.lifecycle, check) {
            Ok(_) => {
                if let Some(sender) = self.shared.progress.get(&self.module.id) {
                    sender.send_modify(|progress| progress.state = target);
                }
                Ok(())
            }
            Err(gantry_gates::Error::GateBlocked {
                transition,
                failures,
                ..
            }) => Err(ModuleError::GateBlocked {
                transition,
                failures,
            }),
            Err(_) => Err(ModuleError::IllegalTransition {
                from: self.lifecycle.state(),
                to: target,
            }),
        }
    }

    /// Wait until every dependency reached `required`.
    ///
    /// With `finalized`, also wait until each has stopped progressing. A
    /// dependency that stopped short of `required` halts this module.
    async fn wait_for_dependencies(
        &self,
        required: LifecycleState,
        finalized: bool,
    ) -> std::result::Result<(), ModuleError> {
        for dependency in &self.dependencies {
            let Some(sender) = self.shared.progress.get(dependency) else {
                continue;
            };
            let mut rx = sender.subscribe();
            tracing::debug!(module = %self.module.id, %dependency, %required, "Waiting on dependency");

            let observed = tokio::select! {
                _ = self.shared.cancel.cancelled() => return Err(self.cancelled()),
                result = rx.wait_for(|p| p.finalized || (!finalized && p.state >= required)) => {
                    result.map(|progress| *progress)
                }
            };
            let progress = observed.map_err(|_| ModuleError::Aborted {
                reason: format!("progress of '{dependency}' is no longer observable"),
            })?;

            if progress.state < required {
                return Err(ModuleError::UpstreamFailure {
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    async fn permit(&self) -> std::result::Result<SemaphorePermit<'a>, ModuleError> {
        let shared = self.shared;
        tokio::select! {
            _ = shared.cancel.cancelled() => Err(self.cancelled()),
            permit = shared.permits.acquire() => permit.map_err(|_| ModuleError::Aborted {
                reason: "run is shutting down".to_string(),
            }),
        }
    }

    fn bindings_of(&self, kind: CapabilityKind) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(move |binding| binding.kind() == kind)
    }

    fn context(&self) -> std::result::Result<&ModuleContext, ModuleError> {
        self.context.as_ref().ok_or_else(|| ModuleError::Aborted {
            reason: "module was not configured".to_string(),
        })
    }

    fn capability_policy(&self) -> RetryPolicy {
        RetryPolicy::capability(&self.shared.settings)
    }

    fn cancelled(&self) -> ModuleError {
        ModuleError::Cancelled {
            state: self.lifecycle.state(),
        }
    }

    fn call_failed(
        &self,
        failure: CallFailure,
        capability: &str,
        on_error: impl FnOnce(String) -> ModuleError,
    ) -> ModuleError {
        match failure {
            CallFailure::TimedOut { attempts } => ModuleError::CapabilityTimeout {
                capability: capability.to_string(),
                attempts,
            },
            CallFailure::Cancelled => self.cancelled(),
            CallFailure::Failed(err) => on_error(err.to_string()),
        }
    }
}
