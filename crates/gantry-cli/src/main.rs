//! Gantry CLI
//!
//! Builds, verifies and publishes the modules declared in a `gantry.toml`.

mod cli;
mod commands;
mod context;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands, HooksAction};
use commands::RunOptions;
use context::Workspace;
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// `-v` forces debug output, otherwise `RUST_LOG` decides, defaulting to info
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("{} build orchestration", "gantry".green().bold());
        println!();
        println!("Run {} for available commands.", "gantry --help".cyan());
        return Ok(());
    };

    let workspace = || Workspace::load(&cli.file);
    match command {
        Commands::Run {
            json,
            jobs,
            install_hooks,
        } => {
            let options = RunOptions {
                json,
                jobs,
                install_hooks,
            };
            commands::run_pipeline(&workspace()?, options).await
        }
        Commands::Check => commands::run_check(&workspace()?),
        Commands::Order => commands::run_order(&workspace()?),
        Commands::Config { module, json } => commands::run_config(&workspace()?, &module, json),
        Commands::Capabilities => commands::run_capabilities(&workspace()?),
        Commands::Hooks { action } => {
            let workspace = workspace()?;
            match action {
                HooksAction::List => commands::run_hooks_list(&workspace),
                HooksAction::Install => commands::run_hooks_install(&workspace).await,
                HooksAction::Run { name } => commands::run_hook(&workspace, &name).await,
            }
        }
        Commands::CommitCheck { file } => commands::run_commit_check(&file),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "gantry", &mut std::io::stdout());
            Ok(())
        }
    }
}
