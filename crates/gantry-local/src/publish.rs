//! Directory publisher
//!
//! Copies each artifact into `<repository>/<module>/` and writes a
//! `<file>.sha256` sidecar next to it. The repository comes from
//! `publish.repository` (relative paths resolve against the workspace root)
//! or from the publisher's fallback directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use gantry_core::{Artifact, CollaboratorResult, ModuleContext, PublishReceipt, Publisher};

use crate::checksum::file_checksum;
use crate::error::{Error, Result};

pub const REPOSITORY_KEY: &str = "publish.repository";

#[derive(Debug, Clone, Default)]
pub struct DirectoryPublisher {
    fallback: Option<PathBuf>,
}

impl DirectoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository used when a module does not configure one
    pub fn with_fallback(mut self, repository: impl Into<PathBuf>) -> Self {
        self.fallback = Some(repository.into());
        self
    }

    fn repository(&self, ctx: &ModuleContext) -> Result<PathBuf> {
        match ctx.config.get_str(REPOSITORY_KEY) {
            Some(repository) => Ok(resolve(&ctx.workspace_root, Path::new(repository))),
            None => self.fallback.clone().ok_or_else(|| Error::MissingOption {
                key: REPOSITORY_KEY.to_string(),
            }),
        }
    }

    async fn copy(&self, ctx: &ModuleContext, artifact: &Artifact) -> Result<PublishReceipt> {
        if !artifact.path.is_file() {
            return Err(Error::ArtifactMissing {
                path: artifact.path.clone(),
            });
        }
        let target_dir = self.repository(ctx)?.join(ctx.module.as_str());
        tokio::fs::create_dir_all(&target_dir).await?;

        let file_name = artifact
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| format!("{}.jar", ctx.module).into());
        let target = target_dir.join(&file_name);
        tokio::fs::copy(&artifact.path, &target).await?;

        let checksum = file_checksum(&target).await?;
        if let Some(expected) = &artifact.checksum {
            if *expected != checksum {
                return Err(Error::ChecksumMismatch {
                    path: target,
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
        }
        let mut sidecar = target.clone().into_os_string();
        sidecar.push(".sha256");
        tokio::fs::write(PathBuf::from(sidecar), format!("{checksum}\n")).await?;

        tracing::info!(module = %ctx.module, target = %target.display(), "Published artifact");
        Ok(PublishReceipt {
            location: target.display().to_string(),
            checksum,
            published_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    async fn publish(
        &self,
        ctx: &ModuleContext,
        artifact: &Artifact,
    ) -> CollaboratorResult<PublishReceipt> {
        Ok(self.copy(ctx, artifact).await?)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
