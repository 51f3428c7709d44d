//! Workspace-level scenarios
//!
//! Each test declares a small multi-module build in TOML, runs it through the
//! orchestrator with scripted collaborators and checks the lifecycle outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use gantry_capability::Binding;
use gantry_config::InheritMode;
use gantry_core::{
    Artifact, BuildTool, CollaboratorError, CollaboratorResult, Collaborators, Declarations, Error,
    Instrumenter, ModuleContext, ModuleError, Plan, PublishReceipt, Publisher, RunReport,
    TestRunner,
};
use gantry_gates::{Counter, CounterKind, CoverageMetrics, PackageCoverage};
use gantry_graph::LifecycleState;
use pretty_assertions::assert_eq;

// =============================================================================
// Test Infrastructure
// =============================================================================

const IHUB: &str = r#"
[settings]
max_parallel = 1
capability_timeout_secs = 10
gate_timeout_secs = 10
max_retries = 0

[root]
capabilities = ["java", "test", "verification", "publish"]
implicit_dependency = "core"

[defaults]
"doc.encoding" = "UTF-8"

[[module]]
id = "bom"
kind = "platform"

[[module]]
id = "core"

[[module]]
id = "client"

[[module]]
id = "service"

[[module]]
id = "rest"
kind = "application"
depends_on = ["client", "service"]
capabilities = ["boot"]

[module.options.verification]
instruction_ratio = 0.5
package_exclusions = ["pub.ihub.demo.rest"]

[[gate]]
name = "tests"
transition = "built->verified"
capability = "test"
check = { type = "tests-passed" }

[[gate]]
name = "coverage"
transition = "built->verified"
capability = "verification"
check = { type = "coverage" }
"#;

/// Collaborators answering from per-module scripts
#[derive(Default)]
struct ScriptedBuild {
    metrics: BTreeMap<String, CoverageMetrics>,
    broken: BTreeSet<String>,
    compiled: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
}

impl ScriptedBuild {
    fn new() -> Self {
        Self::default()
    }

    fn metrics(mut self, module: &str, metrics: CoverageMetrics) -> Self {
        self.metrics.insert(module.to_string(), metrics);
        self
    }

    fn broken(mut self, module: &str) -> Self {
        self.broken.insert(module.to_string());
        self
    }

    fn compiled(&self) -> Vec<String> {
        self.compiled.lock().unwrap().clone()
    }

    fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    async fn run(self, declarations: &str) -> (Arc<Self>, gantry_core::Result<RunReport>) {
        let declarations = Declarations::parse(declarations).unwrap();
        let build = Arc::new(self);
        let collaborators =
            Collaborators::new(build.clone(), build.clone(), build.clone(), build.clone());
        let report = gantry_core::run(&declarations, collaborators).await;
        (build, report)
    }
}

#[async_trait]
impl BuildTool for ScriptedBuild {
    async fn compile(&self, ctx: &ModuleContext) -> CollaboratorResult<Artifact> {
        self.compiled.lock().unwrap().push(ctx.module.to_string());
        if self.broken.contains(ctx.module.as_str()) {
            return Err(CollaboratorError::failed("javac exited with 1"));
        }
        Ok(Artifact::new(format!("{}/build/libs/{}.jar", ctx.module, ctx.module)))
    }
}

#[async_trait]
impl TestRunner for ScriptedBuild {
    async fn run_tests(&self, ctx: &ModuleContext) -> CollaboratorResult<CoverageMetrics> {
        Ok(self
            .metrics
            .get(ctx.module.as_str())
            .cloned()
            .unwrap_or_else(|| covered("pub.ihub", 8, 2).with_tests(5, 0, 0)))
    }
}

#[async_trait]
impl Instrumenter for ScriptedBuild {
    async fn instrument(&self, _ctx: &ModuleContext, _binding: &Binding) -> CollaboratorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Publisher for ScriptedBuild {
    async fn publish(
        &self,
        ctx: &ModuleContext,
        artifact: &Artifact,
    ) -> CollaboratorResult<PublishReceipt> {
        self.published.lock().unwrap().push(ctx.module.to_string());
        Ok(PublishReceipt {
            location: format!("repo://{}", artifact.path.display()),
            checksum: format!("sha256:{}", ctx.module),
            published_at: Utc::now(),
        })
    }
}

fn covered(package: &str, covered: u64, missed: u64) -> CoverageMetrics {
    CoverageMetrics::new().with_package(
        PackageCoverage::new(package).with_counter(CounterKind::Instruction, Counter::new(covered, missed)),
    )
}

fn state(report: &RunReport, module: &str) -> LifecycleState {
    report.state_of(module).unwrap_or_else(|| panic!("{module} missing from report"))
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn ihub_build_publishes_in_dependency_order() {
    let (build, report) = ScriptedBuild::new().run(IHUB).await;
    let report = report.unwrap();

    assert!(report.success, "{report:#?}");
    let published = build.published();
    assert_eq!(published.len(), 4);
    assert_eq!(published.first().map(String::as_str), Some("core"));
    assert_eq!(published.last().map(String::as_str), Some("rest"));
    // platform modules have nothing to compile
    assert!(!build.compiled().contains(&"bom".to_string()));
    assert_eq!(state(&report, "bom"), LifecycleState::Published);
}

#[tokio::test]
async fn cycle_aborts_before_any_module_is_processed() {
    let cyclic = r#"
[[module]]
id = "client"
depends_on = ["service"]

[[module]]
id = "service"
depends_on = ["client"]
"#;
    let (build, report) = ScriptedBuild::new().run(cyclic).await;

    let err = report.unwrap_err();
    assert!(matches!(
        err,
        Error::Graph(gantry_graph::Error::CycleDetected { ref members }) if members.len() == 2
    ));
    assert!(build.compiled().is_empty());
}

#[tokio::test]
async fn blocked_gate_keeps_module_and_dependents_unpublished() {
    let (build, report) = ScriptedBuild::new()
        .metrics("core", covered("pub.ihub.core", 9, 1).with_tests(10, 2, 0))
        .run(IHUB)
        .await;
    let report = report.unwrap();

    assert!(!report.success);
    assert_eq!(state(&report, "core"), LifecycleState::Built);
    let failures = report.module("core").unwrap().blocking_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].gate, "tests");

    for dependent in ["client", "service", "rest"] {
        assert_ne!(state(&report, dependent), LifecycleState::Published, "{dependent}");
    }
    assert!(build.published().is_empty());
}

#[tokio::test]
async fn excluded_package_is_left_out_of_the_coverage_ratio() {
    // 21 of 50 instructions raw; 9 of 10 once the rest package is excluded
    let metrics = covered("pub.ihub.demo", 9, 1)
        .with_package(
            PackageCoverage::new("pub.ihub.demo.rest")
                .with_counter(CounterKind::Instruction, Counter::new(12, 28)),
        )
        .with_tests(6, 0, 0);
    assert_eq!(metrics.ratio(CounterKind::Instruction, &[]), Some(0.42));

    let (_, report) = ScriptedBuild::new()
        .metrics("rest", metrics.clone())
        .run(IHUB)
        .await;
    assert_eq!(state(&report.unwrap(), "rest"), LifecycleState::Published);

    let without_exclusion = IHUB.replace(r#"package_exclusions = ["pub.ihub.demo.rest"]"#, "");
    let (_, report) = ScriptedBuild::new()
        .metrics("rest", metrics)
        .run(&without_exclusion)
        .await;
    let report = report.unwrap();
    assert_eq!(state(&report, "rest"), LifecycleState::Built);
    assert_eq!(report.module("rest").unwrap().blocking_failures()[0].gate, "coverage");
}

#[tokio::test]
async fn independent_module_publishes_when_a_sibling_is_blocked() {
    let (build, report) = ScriptedBuild::new().broken("client").run(IHUB).await;
    let report = report.unwrap();

    assert_eq!(state(&report, "client"), LifecycleState::Configured);
    assert_eq!(state(&report, "service"), LifecycleState::Published);
    assert_eq!(state(&report, "core"), LifecycleState::Published);
    assert!(matches!(
        report.module("client").unwrap().errors[0],
        ModuleError::Build { .. }
    ));
    // rest needs client to build before it can
    assert_eq!(state(&report, "rest"), LifecycleState::Configured);
    assert!(!build.compiled().contains(&"rest".to_string()));
}

#[tokio::test]
async fn undefined_capability_leaves_the_module_unconfigured() {
    let declarations = format!(
        "{IHUB}\n[[module]]\nid = \"mobile\"\ncapabilities = [\"kotlin\"]\n"
    );
    let (build, report) = ScriptedBuild::new().run(&declarations).await;
    let report = report.unwrap();

    let mobile = report.module("mobile").unwrap();
    assert_eq!(mobile.terminal_state, LifecycleState::Declared);
    assert!(mobile.bindings.is_empty());
    assert!(
        matches!(&mobile.errors[0], ModuleError::Configuration { reason } if reason.contains("kotlin"))
    );
    assert!(!build.compiled().contains(&"mobile".to_string()));
    assert_eq!(state(&report, "rest"), LifecycleState::Published);
}

#[test]
fn configuration_is_repeatable_and_exclusions_win() {
    let declarations = Declarations::parse(&format!(
        "{IHUB}\n[[module]]\nid = \"docs\"\nexclusions = [\"doc.*\", \"java.encoding\"]\n\n[module.overrides]\n\"doc.encoding\" = \"GBK\"\n"
    ))
    .unwrap();
    let plan = Plan::build(&declarations, InheritMode::None).unwrap();
    let docs = plan.module("docs").unwrap();

    let first = plan.configure(docs).unwrap();
    let second = plan.configure(docs).unwrap();
    assert_eq!(first.config, second.config);
    assert!(!first.config.contains_key("doc.encoding"));
    assert!(!first.config.contains_key("java.encoding"));
    assert_eq!(first.config.get_str("java.source_compatibility"), Some("17"));
}

#[test]
fn unknown_capability_is_reported_by_name() {
    let declarations = Declarations::parse(&format!(
        "{IHUB}\n[[module]]\nid = \"mobile\"\ncapabilities = [\"kotlin\"]\n"
    ))
    .unwrap();
    let plan = Plan::build(&declarations, InheritMode::None).unwrap();

    let err = plan.configure(plan.module("mobile").unwrap()).unwrap_err();
    assert!(matches!(
        err,
        Error::Capability(gantry_capability::Error::UnknownCapability { ref name }) if name == "kotlin"
    ));
}
