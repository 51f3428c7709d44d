//! Commands that inspect the plan without running anything

use colored::Colorize;
use gantry_capability::BindOutcome;

use crate::context::Workspace;
use crate::error::{CliError, Result};

/// Validate declarations and configure every module
pub fn run_check(workspace: &Workspace) -> Result<()> {
    let plan = workspace.plan()?;
    let mut failed = 0;

    for id in plan.order() {
        let module = plan.module(id.as_str())?;
        match plan.configure(module) {
            Ok(configured) => println!(
                "  {} {} ({} capabilities, {} keys)",
                "\u{2713}".green(),
                id.to_string().cyan(),
                configured.bindings.len(),
                configured.config.len()
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "\u{2717}".red(), id.to_string().cyan(), e);
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(CliError::user(format!("{failed} module(s) failed to configure")));
    }
    println!(
        "{} {} modules, {} capabilities, {} gates",
        "\u{2713}".green().bold(),
        plan.order().len(),
        plan.capabilities().len(),
        plan.engine().gates().len()
    );
    Ok(())
}

/// Print the order modules are processed in
pub fn run_order(workspace: &Workspace) -> Result<()> {
    let plan = workspace.plan()?;
    for (position, id) in plan.order().iter().enumerate() {
        let module = plan.module(id.as_str())?;
        let deps = module
            .depends_on
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if deps.is_empty() {
            println!("{:>3}. {}", position + 1, id);
        } else {
            println!("{:>3}. {} {}", position + 1, id, format!("<- {deps}").dimmed());
        }
    }
    Ok(())
}

/// Show what a module binds and the configuration it resolves to
pub fn run_config(workspace: &Workspace, module: &str, json: bool) -> Result<()> {
    let plan = workspace.plan()?;
    let declared = plan.module(module)?;
    let configured = plan.configure(declared)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&configured.config)?);
        return Ok(());
    }

    println!("{} {}", "Module".bold(), module.cyan());
    println!();
    println!("{}:", "Capabilities".bold());
    for outcome in &configured.outcomes {
        match outcome {
            BindOutcome::Applied(binding) => println!(
                "  {} {} {}",
                "+".green(),
                binding.name().cyan(),
                binding.capability.version.to_string().dimmed()
            ),
            BindOutcome::SkippedByPredicate { capability } => {
                println!("  {} {} {}", "-".dimmed(), capability, "(not applicable)".dimmed())
            }
            BindOutcome::SkippedByExclusion { capability } => {
                println!("  {} {} {}", "-".dimmed(), capability, "(excluded)".dimmed())
            }
        }
    }
    println!();
    println!("{}:", "Configuration".bold());
    if configured.config.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for (key, value) in configured.config.iter() {
        println!("  {:<40} {}", key, value);
    }
    Ok(())
}

/// List the defined capabilities
pub fn run_capabilities(workspace: &Workspace) -> Result<()> {
    let plan = workspace.plan()?;
    println!(
        "  {:<24} {:<10} {:<22} {}",
        "NAME".bold(),
        "VERSION".bold(),
        "KIND".bold(),
        "DESCRIPTION".bold()
    );
    println!("  {}", "\u{2500}".repeat(70).dimmed());
    for capability in plan.capabilities().iter() {
        println!(
            "  {:<24} {:<10} {:<22} {}",
            capability.name.cyan(),
            capability.version.to_string(),
            capability.kind.to_string(),
            capability.description.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}
