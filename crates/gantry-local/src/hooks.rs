//! Git hooks collaborator

use std::path::Path;

use async_trait::async_trait;
use gantry_core::{CollaboratorResult, VcsHooks};
use gantry_gates::{GitHooks, HookName};

use crate::error::{Error, Result};

/// [`VcsHooks`] backed by the hooks directory of a git repository
#[derive(Debug, Clone)]
pub struct GitHooksAdapter {
    hooks: GitHooks,
}

impl GitHooksAdapter {
    pub fn discover(path: &Path) -> Result<Self> {
        Ok(Self {
            hooks: GitHooks::discover(path)?,
        })
    }

    pub fn hooks(&self) -> &GitHooks {
        &self.hooks
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(GitHooks) -> gantry_gates::Result<T> + Send + 'static,
    {
        let hooks = self.hooks.clone();
        tokio::task::spawn_blocking(move || work(hooks))
            .await
            .map_err(|err| Error::Io(std::io::Error::other(err)))?
            .map_err(Error::from)
    }
}

#[async_trait]
impl VcsHooks for GitHooksAdapter {
    async fn install_hook(&self, hook: HookName, command: &str) -> CollaboratorResult<()> {
        let command = command.to_string();
        self.blocking(move |hooks| hooks.install(hook, &command).map(|_| ()))
            .await?;
        Ok(())
    }

    async fn run_hook(&self, hook: HookName) -> CollaboratorResult<()> {
        let run = self.blocking(move |hooks| hooks.run(hook, &[])).await?;
        tracing::debug!(%hook, stdout = %run.stdout.trim(), "Hook finished");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn install_and_run_through_adapter() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let adapter = GitHooksAdapter::discover(dir.path()).unwrap();

        adapter
            .install_hook(HookName::PreCommit, "touch ran")
            .await
            .unwrap();
        adapter.run_hook(HookName::PreCommit).await.unwrap();
        assert!(dir.path().join("ran").exists());

        adapter
            .install_hook(HookName::PrePush, "exit 1")
            .await
            .unwrap();
        assert!(adapter.run_hook(HookName::PrePush).await.is_err());
    }

    #[test]
    fn discover_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        assert!(GitHooksAdapter::discover(&dir.path().join("nowhere")).is_err());
    }
}
