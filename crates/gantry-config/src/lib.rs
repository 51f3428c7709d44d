//! Configuration for Gantry
//!
//! Two concerns live here:
//!
//! - **Module configuration**: [`ConfigResolver`] merges root defaults,
//!   capability defaults, inherited and module overrides and binding options
//!   into one [`EffectiveConfig`] per module, then applies exclusions.
//! - **Run settings**: [`SettingsLoader`] layers built-in defaults, the
//!   user-global settings file and the workspace `[settings]` table into
//!   [`RunSettings`].
//!
//! # Example
//!
//! ```
//! use gantry_config::{ConfigResolver, ConfigScope};
//! use gantry_graph::{Module, ModuleRegistry};
//! use serde_json::json;
//!
//! let module = Module::new("rest").with_override("doc.encoding", json!("UTF-8"));
//! let mut registry = ModuleRegistry::new();
//! registry.register(module.clone()).unwrap();
//!
//! let scope = ConfigScope::empty();
//! let config = ConfigResolver::new(&scope, &registry).resolve(&module, &[]).unwrap();
//! assert_eq!(config.get_str("doc.encoding"), Some("UTF-8"));
//! ```

mod effective;
pub mod error;
mod resolver;
mod scope;
mod settings;

pub use effective::{EffectiveConfig, is_excluded};
pub use error::{Error, Result};
pub use resolver::ConfigResolver;
pub use scope::{ConfigScope, InheritMode};
pub use settings::{RunSettings, SettingsLayer, SettingsLoader};
