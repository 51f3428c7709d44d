//! Hooks and commit-check command implementations

use std::path::Path;

use colored::Colorize;
use gantry_config::RunSettings;
use gantry_gates::{GitHooks, HookName, validate_commit_message};

use crate::context::Workspace;
use crate::error::{CliError, Result};

/// List declared hooks and their install status
pub fn run_hooks_list(workspace: &Workspace) -> Result<()> {
    let declared = workspace.declarations.hook_commands()?;
    if declared.is_empty() {
        println!("{} No hooks declared.", "note:".yellow().bold());
        println!("  Hooks: {}", HookName::all_names().join(", ").dimmed());
        return Ok(());
    }

    let installed = match GitHooks::discover(&workspace.root) {
        Ok(hooks) => hooks.installed()?,
        Err(e) => {
            tracing::debug!(error = %e, "No git repository");
            Vec::new()
        }
    };

    println!("  {:<12} {:<10} {}", "HOOK".bold(), "STATUS".bold(), "COMMAND".bold());
    println!("  {}", "\u{2500}".repeat(55).dimmed());
    for (hook, command) in &declared {
        let status = match installed.iter().find(|(name, _)| name == hook) {
            Some((_, current)) if current.as_str() == command.trim() => "installed".green(),
            Some(_) => "outdated".yellow(),
            None => "missing".red(),
        };
        println!("  {:<12} {:<10} {}", hook.to_string().cyan(), status, command);
    }
    Ok(())
}

/// Install every declared hook into the git repository
pub async fn run_hooks_install(workspace: &Workspace) -> Result<()> {
    let orchestrator = workspace.orchestrator(RunSettings::default());
    let installed = orchestrator.install_hooks(&workspace.declarations).await?;
    if installed.is_empty() {
        println!("{} No hooks declared.", "note:".yellow().bold());
    }
    for hook in installed {
        println!("{} Installed {}", "\u{2713}".green().bold(), hook.to_string().cyan());
    }
    Ok(())
}

/// Run one installed hook
pub async fn run_hook(workspace: &Workspace, name: &str) -> Result<()> {
    let hook: HookName = name.parse()?;
    let orchestrator = workspace.orchestrator(RunSettings::default());
    orchestrator.run_hook(hook).await?;
    println!("{} {} passed", "\u{2713}".green().bold(), hook.to_string().cyan());
    Ok(())
}

/// Validate the commit message stored in `file`
pub fn run_commit_check(file: &Path) -> Result<()> {
    let message = std::fs::read_to_string(file)
        .map_err(|e| CliError::user(format!("cannot read {}: {e}", file.display())))?;
    validate_commit_message(&message)?;
    println!("{} Commit message ok", "\u{2713}".green().bold());
    Ok(())
}
