//! Shell test runner
//!
//! The test command is expected to write a JSON coverage report:
//!
//! ```json
//! {
//!   "packages": [
//!     { "package": "pub.ihub.demo.service", "instruction": { "covered": 18, "missed": 12 } }
//!   ],
//!   "tests": { "passed": 12, "failed": 0, "skipped": 1 }
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gantry_core::{CollaboratorResult, ModuleContext, TestRunner};
use gantry_gates::CoverageMetrics;

use crate::error::{Error, Result};
use crate::shell::run_for_module;

pub const COMMAND_KEY: &str = "test.command";
pub const REPORT_KEY: &str = "test.coverage_report";
const DEFAULT_REPORT: &str = "build/coverage.json";

/// Runs `test.command` and reads the coverage report it leaves behind
#[derive(Debug, Clone, Default)]
pub struct ShellTestRunner;

impl ShellTestRunner {
    pub fn new() -> Self {
        Self
    }

    async fn test(&self, ctx: &ModuleContext) -> Result<CoverageMetrics> {
        let command = ctx.config.get_str(COMMAND_KEY).ok_or_else(|| Error::MissingOption {
            key: COMMAND_KEY.to_string(),
        })?;
        let report = report_path(ctx);
        clear_report(&report).await?;
        let output = run_for_module(command, ctx, &[("GANTRY_COVERAGE_REPORT", report.display().to_string())]).await?;

        // Failing tests exit non-zero but still report; gates decide on that
        if !report.is_file() {
            if !output.success() {
                return Err(Error::CommandFailed {
                    command: command.to_string(),
                    code: output.code.unwrap_or(-1),
                    stderr: output.stderr.trim().to_string(),
                });
            }
            return Err(Error::ReportMissing { path: report });
        }

        let content = tokio::fs::read_to_string(&report).await?;
        let metrics: CoverageMetrics = serde_json::from_str(&content)
            .map_err(|source| Error::InvalidReport {
                path: report.clone(),
                source,
            })?;
        tracing::debug!(
            module = %ctx.module,
            packages = metrics.packages.len(),
            failed = metrics.tests.failed,
            "Read coverage report"
        );
        Ok(metrics)
    }
}

#[async_trait]
impl TestRunner for ShellTestRunner {
    async fn run_tests(&self, ctx: &ModuleContext) -> CollaboratorResult<CoverageMetrics> {
        Ok(self.test(ctx).await?)
    }
}

/// A report left by an earlier run must never be read as this run's result
async fn clear_report(report: &Path) -> Result<()> {
    match tokio::fs::remove_file(report).await {
        Ok(()) => {
            tracing::debug!(path = %report.display(), "Removed previous coverage report");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn report_path(ctx: &ModuleContext) -> PathBuf {
    ctx.module_dir
        .join(ctx.config.get_str(REPORT_KEY).unwrap_or(DEFAULT_REPORT))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use gantry_config::EffectiveConfig;
    use gantry_graph::{ModuleId, ModuleKind};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const REPORT: &str = r#"{"packages":[{"package":"a","instruction":{"covered":3,"missed":1}}],"tests":{"passed":2,"failed":1}}"#;

    fn context(root: &std::path::Path, command: &str) -> ModuleContext {
        std::fs::create_dir_all(root.join("core/build")).unwrap();
        ModuleContext::new(
            ModuleId::from("core"),
            ModuleKind::Library,
            root,
            "core",
            EffectiveConfig::from(BTreeMap::from([(COMMAND_KEY.to_string(), json!(command))])),
        )
    }

    #[tokio::test]
    async fn failing_tests_still_report_metrics() {
        let dir = TempDir::new().unwrap();
        let command = format!("printf '%s' '{REPORT}' > \"$GANTRY_COVERAGE_REPORT\"; exit 1");
        let metrics = ShellTestRunner::new()
            .run_tests(&context(dir.path(), &command))
            .await
            .unwrap();
        assert_eq!(metrics.tests.failed, 1);
        assert_eq!(metrics.packages[0].instruction.covered, 3);
    }

    #[tokio::test]
    async fn crash_without_report_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ShellTestRunner::new()
            .run_tests(&context(dir.path(), "exit 2"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with code 2"), "{err}");
    }

    #[tokio::test]
    async fn crash_does_not_reuse_previous_report() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), "echo crashed >&2; exit 1");
        std::fs::write(dir.path().join("core/build/coverage.json"), REPORT).unwrap();

        let err = ShellTestRunner::new().run_tests(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("exited with code 1"), "{err}");
        assert!(!dir.path().join("core/build/coverage.json").exists());
    }

    #[tokio::test]
    async fn garbage_report_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ShellTestRunner::new()
            .run_tests(&context(dir.path(), "echo nope > build/coverage.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid coverage report"), "{err}");
    }
}
