//! Capability system for Gantry.
//!
//! A capability is a named, versioned unit of build behaviour (compilation,
//! testing, verification, publishing, ...) with a configuration schema and an
//! applicability predicate. Capabilities are defined once in a
//! [`CapabilitySet`] and shared; modules hold [`Binding`]s to them.

pub mod binding;
pub mod builtins;
pub mod capability;
pub mod error;
pub mod schema;
pub mod set;

pub use binding::{BindOutcome, Binding};
pub use capability::{Applicability, Capability, CapabilityKind, CapabilityRequest};
pub use error::{Error, Result};
pub use schema::{ConfigSchema, OptionSpec, OptionType};
pub use set::{CapabilitySet, MigrationPolicy};
