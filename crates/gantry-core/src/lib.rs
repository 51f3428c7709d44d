//! Orchestration core for Gantry
//!
//! This crate ties the module graph, capability set, configuration resolver
//! and gate engine together into a run:
//!
//! - [`Declarations`] parse `gantry.toml`.
//! - [`Plan`] validates them once, before any module starts.
//! - [`Orchestrator`] drives every module through its lifecycle concurrently,
//!   calling the external [`collaborators`] and collecting a [`RunReport`].
//!
//! # Example
//!
//! ```
//! use gantry_core::{Declarations, Plan};
//! use gantry_config::InheritMode;
//!
//! let declarations = Declarations::parse(r#"
//! [root]
//! capabilities = ["java"]
//! implicit_dependency = "core"
//!
//! [[module]]
//! id = "core"
//!
//! [[module]]
//! id = "rest"
//! "#).unwrap();
//!
//! let plan = Plan::build(&declarations, InheritMode::None).unwrap();
//! let order: Vec<&str> = plan.order().iter().map(|id| id.as_str()).collect();
//! assert_eq!(order, vec!["core", "rest"]);
//! ```

pub mod collaborators;
pub mod declarations;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod retry;

pub use collaborators::{
    Artifact, BuildTool, CollaboratorResult, Collaborators, Instrumenter, ModuleContext,
    PublishReceipt, Publisher, TestRunner, VcsHooks,
};
pub use declarations::{CapabilityDeclaration, Declarations, RootDeclaration};
pub use error::{CollaboratorError, Error, ModuleError, Result};
pub use orchestrator::{Orchestrator, run};
pub use plan::{ConfiguredModule, Plan};
pub use report::{ModuleReport, RunReport};
pub use retry::RetryPolicy;
