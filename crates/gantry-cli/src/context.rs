//! The workspace a command operates on
//!
//! A workspace is a declarations file plus the directory it lives in. Module
//! source directories, relative repositories and git discovery all resolve
//! against that directory.

use std::path::{Path, PathBuf};

use colored::Colorize;
use gantry_config::{RunSettings, SettingsLoader};
use gantry_core::{Declarations, Orchestrator, Plan};
use gantry_local::local_collaborators;

use crate::error::{CliError, Result};

#[derive(Debug)]
pub struct Workspace {
    pub file: PathBuf,
    pub root: PathBuf,
    pub declarations: Declarations,
}

impl Workspace {
    /// Load the declarations file at `file`.
    pub fn load(file: &Path) -> Result<Self> {
        if !file.is_file() {
            return Err(CliError::user(format!(
                "no declarations file at {} (use {} to point at one)",
                file.display(),
                "--file".cyan()
            )));
        }
        let root = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        let declarations = Declarations::load(file)?;
        tracing::debug!(file = %file.display(), root = %root.display(), modules = declarations.module.len(), "Loaded declarations");
        Ok(Self {
            file: file.to_path_buf(),
            root,
            declarations,
        })
    }

    /// Settings from the global settings file and `[settings]`, then `jobs`
    pub fn settings(&self, jobs: Option<usize>) -> Result<RunSettings> {
        let mut settings = SettingsLoader::new().load(&self.declarations.settings)?;
        if let Some(jobs) = jobs {
            settings = settings.with_max_parallel(jobs);
            settings.validate()?;
        }
        Ok(settings)
    }

    pub fn plan(&self) -> Result<Plan> {
        let settings = self.settings(None)?;
        Ok(Plan::build(&self.declarations, settings.inherit)?)
    }

    /// An orchestrator wired to the local collaborators
    pub fn orchestrator(&self, settings: RunSettings) -> Orchestrator {
        Orchestrator::new(local_collaborators(&self.root), settings).with_workspace_root(&self.root)
    }
}
