//! Shell build tool
//!
//! # Example TOML
//!
//! ```toml
//! [module.options.java]
//! command = "./gradlew :core:jar"
//! artifact = "build/libs/core.jar"
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use gantry_core::{Artifact, BuildTool, CollaboratorResult, ModuleContext};

use crate::checksum::file_checksum;
use crate::error::{Error, Result};
use crate::shell::run_checked;

/// Keys searched, in order, for the build command
pub const COMMAND_KEYS: [&str; 2] = ["java.command", "build.command"];

/// Key of the artifact path, relative to the module directory
pub const ARTIFACT_KEY: &str = "java.artifact";

/// Runs the configured build command and checksums its artifact
#[derive(Debug, Clone, Default)]
pub struct ShellBuildTool;

impl ShellBuildTool {
    pub fn new() -> Self {
        Self
    }

    async fn build(&self, ctx: &ModuleContext) -> Result<Artifact> {
        let command = COMMAND_KEYS
            .iter()
            .find_map(|key| ctx.config.get_str(key))
            .ok_or_else(|| Error::MissingOption {
                key: COMMAND_KEYS[0].to_string(),
            })?;
        run_checked(command, ctx, &[]).await?;

        let path = artifact_path(ctx);
        if !path.is_file() {
            return Err(Error::ArtifactMissing { path });
        }
        let checksum = file_checksum(&path).await?;
        tracing::debug!(module = %ctx.module, ?path, %checksum, "Artifact ready");
        Ok(Artifact::new(path).with_checksum(checksum))
    }
}

#[async_trait]
impl BuildTool for ShellBuildTool {
    async fn compile(&self, ctx: &ModuleContext) -> CollaboratorResult<Artifact> {
        Ok(self.build(ctx).await?)
    }
}

fn artifact_path(ctx: &ModuleContext) -> PathBuf {
    match ctx.config.get_str(ARTIFACT_KEY) {
        Some(path) => ctx.module_dir.join(path),
        None => ctx
            .module_dir
            .join("build")
            .join("libs")
            .join(format!("{}.jar", ctx.module)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use gantry_config::EffectiveConfig;
    use gantry_graph::{ModuleId, ModuleKind};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn context(root: &std::path::Path, config: BTreeMap<String, serde_json::Value>) -> ModuleContext {
        std::fs::create_dir_all(root.join("core")).unwrap();
        ModuleContext::new(
            ModuleId::from("core"),
            ModuleKind::Library,
            root,
            "core",
            EffectiveConfig::from(config),
        )
    }

    #[tokio::test]
    async fn builds_default_artifact_path() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            dir.path(),
            BTreeMap::from([(
                "build.command".to_string(),
                json!("mkdir -p build/libs && printf jar > build/libs/core.jar"),
            )]),
        );

        let artifact = ShellBuildTool::new().compile(&ctx).await.unwrap();
        assert_eq!(artifact.path, dir.path().join("core/build/libs/core.jar"));
        assert!(artifact.checksum.unwrap().starts_with("sha256:"));
    }

    #[tokio::test]
    async fn missing_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            dir.path(),
            BTreeMap::from([
                ("java.command".to_string(), json!("true")),
                ("java.artifact".to_string(), json!("out/core.jar")),
            ]),
        );

        let err = ShellBuildTool::new().compile(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("out/core.jar"), "{err}");
    }

    #[tokio::test]
    async fn missing_command_fails() {
        let dir = TempDir::new().unwrap();
        let err = ShellBuildTool::new()
            .compile(&context(dir.path(), BTreeMap::new()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("java.command"), "{err}");
    }
}
