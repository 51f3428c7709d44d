//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Gantry - build orchestration for multi-module projects
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Declarations file
    #[arg(short, long, global = true, env = "GANTRY_FILE", default_value = "gantry.toml")]
    pub file: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build, verify and publish every module
    ///
    /// Exits with code 2 when the run completes but a module did not publish.
    ///
    /// Examples:
    ///   gantry run                   # Run with settings from gantry.toml
    ///   gantry run --jobs 1          # One module step at a time
    ///   gantry run --json > run.json # Machine-readable report
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Maximum number of module steps running at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Install declared git hooks before running
        #[arg(long)]
        install_hooks: bool,
    },

    /// Validate declarations and configure every module without building
    Check,

    /// Print the module processing order
    Order,

    /// Show the bindings and effective configuration of a module
    Config {
        /// Module identifier
        module: String,

        /// Print the effective configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the defined capabilities
    Capabilities,

    /// Manage git hooks
    Hooks {
        #[command(subcommand)]
        action: HooksAction,
    },

    /// Validate a commit message file against the conventional format
    CommitCheck {
        /// File holding the commit message (as passed to commit-msg hooks)
        file: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   gantry completions bash > ~/.local/share/bash-completion/completions/gantry
    ///   gantry completions zsh > ~/.zfunc/_gantry
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Hook subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HooksAction {
    /// List declared hooks and whether they are installed
    List,
    /// Install every declared hook
    Install,
    /// Run one installed hook
    Run {
        /// Hook name (pre-commit, commit-msg, pre-push)
        name: String,
    },
}
