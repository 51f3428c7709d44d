//! Module declarations
//!
//! A [`Module`] is the declared form of one unit of source code: its identity,
//! its place in the graph, the capabilities it asks for and the configuration
//! it overrides. Declarations are immutable once registered; lifecycle
//! progress is tracked by the orchestrator, not stored here.
//!
//! # Example TOML
//!
//! ```toml
//! [[module]]
//! id = "rest"
//! kind = "application"
//! depends_on = ["client", "service"]
//! capabilities = ["boot", "verification@>=1.0"]
//!
//! [module.overrides]
//! "doc.encoding" = "UTF-8"
//!
//! [module.options.verification]
//! instruction_ratio = 0.5
//! package_exclusions = ["pub.ihub.demo.rest"]
//! ```

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Unique identifier of a module
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the identifier is usable as a module name.
    ///
    /// Identifiers must be non-empty and may contain ASCII alphanumerics,
    /// `-`, `_`, `.`, `:` and `/`.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidModuleId {
                id: self.0.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(bad) = self
            .0
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/')))
        {
            return Err(Error::InvalidModuleId {
                id: self.0.clone(),
                reason: format!("contains invalid character '{bad}'"),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What sort of module this is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    /// Ordinary library module
    #[default]
    Library,
    /// Deployable application module
    Application,
    /// Platform/BOM aggregator: declares versions, has no sources of its own
    Platform,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Application => write!(f, "application"),
            Self::Platform => write!(f, "platform"),
        }
    }
}

/// Declaration of a single module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Module {
    /// Unique identifier
    pub id: ModuleId,

    #[serde(default)]
    pub kind: ModuleKind,

    /// Source directory relative to the workspace root (defaults to the id)
    #[serde(default)]
    pub path: Option<String>,

    /// Parent module; a non-owning reference resolved through the registry
    #[serde(default)]
    pub parent: Option<ModuleId>,

    /// Explicit dependency edges
    #[serde(default)]
    pub depends_on: BTreeSet<ModuleId>,

    /// Requested capabilities, optionally with a version requirement
    /// (`"verification@>=1.0"`)
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Module-specific configuration overrides (flat keys)
    #[serde(default)]
    pub overrides: BTreeMap<String, Value>,

    /// Keys removed from the effective configuration after every merge.
    ///
    /// Entries of the form `capability:<name>` exclude a capability instead.
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Options passed when binding each capability
    #[serde(default)]
    pub options: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Module {
    /// Create a library module with no relationships
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ModuleId::new(id),
            kind: ModuleKind::default(),
            path: None,
            parent: None,
            depends_on: BTreeSet::new(),
            capabilities: Vec::new(),
            overrides: BTreeMap::new(),
            exclusions: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(ModuleId::new(parent));
        self
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.insert(ModuleId::new(dependency));
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    pub fn with_exclusion(mut self, key: impl Into<String>) -> Self {
        self.exclusions.push(key.into());
        self
    }

    pub fn with_option(
        mut self,
        capability: impl Into<String>,
        option: impl Into<String>,
        value: Value,
    ) -> Self {
        self.options
            .entry(capability.into())
            .or_default()
            .insert(option.into(), value);
        self
    }

    /// Source directory relative to the workspace root
    pub fn source_dir(&self) -> &str {
        self.path.as_deref().unwrap_or(self.id.as_str())
    }

    /// Whether the module excludes the named capability
    pub fn excludes_capability(&self, name: &str) -> bool {
        self.exclusions
            .iter()
            .filter_map(|entry| entry.strip_prefix("capability:"))
            .any(|excluded| excluded == name)
    }

    /// Direct edges: explicit dependencies plus the parent link
    pub fn edges(&self) -> impl Iterator<Item = &ModuleId> {
        self.depends_on.iter().chain(self.parent.iter())
    }
}
