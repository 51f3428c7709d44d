//! Command implementations for gantry-cli

pub mod hooks;
pub mod inspect;
pub mod run;

pub use hooks::{run_commit_check, run_hook, run_hooks_install, run_hooks_list};
pub use inspect::{run_capabilities, run_check, run_config, run_order};
pub use run::{RunOptions, run_pipeline};
