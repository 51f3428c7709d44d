//! Run command implementation

use colored::{ColoredString, Colorize};
use gantry_core::{ModuleReport, RunReport};
use gantry_graph::LifecycleState;

use crate::context::Workspace;
use crate::error::{CliError, Result};

/// Options for `gantry run`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub json: bool,
    pub jobs: Option<usize>,
    pub install_hooks: bool,
}

/// Run every module through the lifecycle and print the report.
///
/// Ctrl-C cancels the run; modules stop at their last completed state.
pub async fn run_pipeline(workspace: &Workspace, options: RunOptions) -> Result<()> {
    let settings = workspace.settings(options.jobs)?;
    let orchestrator = workspace.orchestrator(settings);

    if options.install_hooks {
        let installed = orchestrator.install_hooks(&workspace.declarations).await?;
        if !options.json {
            for hook in installed {
                println!("{} Installed {}", "\u{2713}".green().bold(), hook.to_string().cyan());
            }
        }
    }

    let cancel = orchestrator.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });

    let report = orchestrator.run(&workspace.declarations).await;
    interrupt.abort();
    let report = report?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::RunFailed {
            failed: report.modules.values().filter(|m| !m.succeeded()).count(),
        })
    }
}

fn print_report(report: &RunReport) {
    println!("{} Run {}", "=>".blue().bold(), report.run_id.to_string().dimmed());
    println!();
    println!("  {:<24} {:<12} {}", "MODULE".bold(), "STATE".bold(), "DETAILS".bold());
    println!("  {}", "\u{2500}".repeat(60).dimmed());

    for module in report.modules.values() {
        println!(
            "  {:<24} {:<12} {}",
            module.module.to_string().cyan(),
            state_label(module),
            details(module)
        );
        for warning in &module.warnings {
            println!(
                "  {:<24} {:<12} {} {}: {}",
                "",
                "",
                "warning:".yellow().bold(),
                warning.gate,
                warning.reason
            );
        }
        for error in &module.errors {
            println!("  {:<24} {:<12} {} {}", "", "", "error:".red().bold(), error);
        }
    }

    println!();
    let counts = report
        .state_counts()
        .into_iter()
        .map(|(state, count)| format!("{count} {state}"))
        .collect::<Vec<_>>()
        .join(", ");
    let elapsed = report.finished_at - report.started_at;
    let summary = format!("{counts} in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    if report.success {
        println!("{} {}", "\u{2713}".green().bold(), summary);
    } else {
        println!("{} {}", "\u{2717}".red().bold(), summary);
    }
}

fn state_label(module: &ModuleReport) -> ColoredString {
    let label = module.terminal_state.to_string();
    if module.succeeded() {
        label.green()
    } else if module.terminal_state == LifecycleState::Published {
        label.yellow()
    } else {
        label.red()
    }
}

fn details(module: &ModuleReport) -> String {
    match &module.receipt {
        Some(receipt) => receipt.location.clone(),
        None => {
            let applied = module.bindings.iter().filter(|b| b.is_applied()).count();
            format!("{applied} capabilities")
        }
    }
}
