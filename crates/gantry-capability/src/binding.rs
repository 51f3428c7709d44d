//! Bindings of capabilities to modules

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::capability::{Capability, CapabilityKind};

/// A capability applied to one module, with validated options.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub capability: Arc<Capability>,
    /// Options passed by the module, already checked against the schema
    pub options: BTreeMap<String, Value>,
}

impl Binding {
    pub fn new(capability: Arc<Capability>, options: BTreeMap<String, Value>) -> Self {
        Self {
            capability,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.capability.name
    }

    pub fn kind(&self) -> CapabilityKind {
        self.capability.kind
    }

    /// Option value, falling back to the schema default
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name).or_else(|| {
            self.capability
                .options
                .get(name)
                .and_then(|spec| spec.default.as_ref())
        })
    }

    /// Binding options under their namespaced configuration keys
    pub fn namespaced_options(&self) -> impl Iterator<Item = (String, &Value)> {
        self.options
            .iter()
            .map(|(option, value)| (self.capability.option_key(option), value))
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            capability: &'a str,
            version: String,
            options: &'a BTreeMap<String, Value>,
        }
        Repr {
            capability: &self.capability.name,
            version: self.capability.version.to_string(),
            options: &self.options,
        }
        .serialize(serializer)
    }
}

/// Result of trying to bind a capability to a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum BindOutcome {
    Applied(Binding),
    /// The applicability predicate rejected the module
    SkippedByPredicate { capability: String },
    /// The module lists the capability in its exclusions
    SkippedByExclusion { capability: String },
}

impl BindOutcome {
    pub fn capability(&self) -> &str {
        match self {
            Self::Applied(binding) => binding.name(),
            Self::SkippedByPredicate { capability } | Self::SkippedByExclusion { capability } => {
                capability
            }
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        match self {
            Self::Applied(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn into_binding(self) -> Option<Binding> {
        match self {
            Self::Applied(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
