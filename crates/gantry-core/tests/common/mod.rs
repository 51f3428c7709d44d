//! Scripted collaborators for driver tests

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gantry_capability::Binding;
use gantry_config::RunSettings;
use gantry_core::{
    Artifact, BuildTool, CollaboratorError, CollaboratorResult, Collaborators, Instrumenter,
    ModuleContext, PublishReceipt, Publisher, TestRunner, VcsHooks,
};
use gantry_gates::{CoverageMetrics, HookName};

/// Build, test, instrument and publish fakes driven by per-module scripts.
///
/// Every call is appended to `log` as `"<step>:<module>"`.
#[derive(Default)]
pub struct FakeTools {
    pub failing_builds: BTreeSet<String>,
    pub slow_tests: BTreeSet<String>,
    pub metrics: BTreeMap<String, CoverageMetrics>,
    pub log: Mutex<Vec<String>>,
    pub test_calls: AtomicU32,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_build(mut self, module: &str) -> Self {
        self.failing_builds.insert(module.to_string());
        self
    }

    pub fn slow_tests(mut self, module: &str) -> Self {
        self.slow_tests.insert(module.to_string());
        self
    }

    pub fn with_metrics(mut self, module: &str, metrics: CoverageMetrics) -> Self {
        self.metrics.insert(module.to_string(), metrics);
        self
    }

    pub fn failing_tests(self, module: &str) -> Self {
        self.with_metrics(module, CoverageMetrics::new().with_tests(4, 1, 0))
    }

    pub fn into_collaborators(self) -> (Arc<Self>, Collaborators) {
        let tools = Arc::new(self);
        let collaborators =
            Collaborators::new(tools.clone(), tools.clone(), tools.clone(), tools.clone());
        (tools, collaborators)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_to(&self, step: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&format!("{step}:")).map(str::to_string))
            .collect()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl BuildTool for FakeTools {
    async fn compile(&self, ctx: &ModuleContext) -> CollaboratorResult<Artifact> {
        self.record(format!("compile:{}", ctx.module));
        if self.failing_builds.contains(ctx.module.as_str()) {
            return Err(CollaboratorError::failed("compilation failed"));
        }
        Ok(Artifact::new(ctx.module_dir.join(format!("build/libs/{}.jar", ctx.module))))
    }
}

#[async_trait]
impl TestRunner for FakeTools {
    async fn run_tests(&self, ctx: &ModuleContext) -> CollaboratorResult<CoverageMetrics> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("test:{}", ctx.module));
        if self.slow_tests.contains(ctx.module.as_str()) {
            tokio::time::sleep(Duration::from_secs(7200)).await;
        }
        Ok(self
            .metrics
            .get(ctx.module.as_str())
            .cloned()
            .unwrap_or_else(|| CoverageMetrics::new().with_tests(3, 0, 0)))
    }
}

#[async_trait]
impl Instrumenter for FakeTools {
    async fn instrument(&self, ctx: &ModuleContext, binding: &Binding) -> CollaboratorResult<()> {
        self.record(format!("instrument:{}:{}", ctx.module, binding.name()));
        Ok(())
    }
}

#[async_trait]
impl Publisher for FakeTools {
    async fn publish(
        &self,
        ctx: &ModuleContext,
        artifact: &Artifact,
    ) -> CollaboratorResult<PublishReceipt> {
        self.record(format!("publish:{}", ctx.module));
        Ok(PublishReceipt {
            location: format!("memory://{}", artifact.path.display()),
            checksum: "0".repeat(64),
            published_at: Utc::now(),
        })
    }
}

/// Hook fake remembering what was installed and run
#[derive(Default)]
pub struct FakeHooks {
    pub installed: Mutex<Vec<(HookName, String)>>,
    pub runs: Mutex<Vec<HookName>>,
}

#[async_trait]
impl VcsHooks for FakeHooks {
    async fn install_hook(&self, hook: HookName, command: &str) -> CollaboratorResult<()> {
        self.installed.lock().unwrap().push((hook, command.to_string()));
        Ok(())
    }

    async fn run_hook(&self, hook: HookName) -> CollaboratorResult<()> {
        self.runs.lock().unwrap().push(hook);
        Ok(())
    }
}

/// Short timeouts and a single retry
pub fn fast_settings() -> RunSettings {
    RunSettings::default()
        .with_max_parallel(4)
        .with_capability_timeout(Duration::from_secs(5))
        .with_gate_timeout(Duration::from_secs(5))
        .with_max_retries(1)
        .with_retry_initial_backoff(Duration::from_millis(10))
}
