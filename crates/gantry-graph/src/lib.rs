//! Module graph for Gantry.
//!
//! This crate owns the declared modules of a build, the relationships between
//! them (parent links and explicit dependency edges) and the lifecycle states
//! a module moves through during an orchestration run.
//!
//! # Example
//!
//! ```
//! use gantry_graph::{Module, ModuleRegistry};
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register(Module::new("core")).unwrap();
//! registry.register(Module::new("rest").depends_on("core")).unwrap();
//!
//! let order = registry.resolve_dependency_order().unwrap();
//! assert_eq!(order[0].as_str(), "core");
//! assert_eq!(order[1].as_str(), "rest");
//! ```

pub mod error;
pub mod lifecycle;
pub mod module;
pub mod registry;

pub use error::{Error, Result};
pub use lifecycle::{LifecycleState, Transition};
pub use module::{Module, ModuleId, ModuleKind};
pub use registry::ModuleRegistry;
