//! Declarations file (`gantry.toml`)
//!
//! Everything a run needs is declared in one file: run settings, root
//! defaults, capability definitions, modules, gates and hooks.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! max_parallel = 4
//! inherit = "parent"
//!
//! [root]
//! capabilities = ["java", "test", "verification", "publish"]
//! implicit_dependency = "core"
//!
//! [defaults]
//! "java.encoding" = "UTF-8"
//!
//! [[module]]
//! id = "core"
//!
//! [[module]]
//! id = "rest"
//! kind = "application"
//! capabilities = ["boot"]
//!
//! [[gate]]
//! name = "tests"
//! transition = "built->verified"
//! check = { type = "tests-passed" }
//!
//! [hooks]
//! commit-msg = "gantry commit-check \"$1\""
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gantry_capability::{Capability, MigrationPolicy};
use gantry_config::SettingsLayer;
use gantry_gates::{Gate, HookName};
use gantry_graph::Module;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

fn default_builtins() -> bool {
    true
}

/// The `[root]` table: rules applied to every module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootDeclaration {
    /// Capabilities requested on behalf of every module
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Module every other module implicitly depends on
    #[serde(default)]
    pub implicit_dependency: Option<String>,

    /// Whether the built-in capability catalog is defined
    #[serde(default = "default_builtins")]
    pub builtins: bool,
}

impl Default for RootDeclaration {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            implicit_dependency: None,
            builtins: default_builtins(),
        }
    }
}

/// A `[[capability]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    #[serde(flatten)]
    pub capability: Capability,

    /// How to treat a clash with an already defined version
    #[serde(default)]
    pub migration: MigrationPolicy,
}

/// Parsed contents of a declarations file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    #[serde(default)]
    pub settings: SettingsLayer,

    #[serde(default)]
    pub root: RootDeclaration,

    /// Root-level configuration defaults (flat keys)
    #[serde(default)]
    pub defaults: BTreeMap<String, Value>,

    #[serde(default)]
    pub capability: Vec<CapabilityDeclaration>,

    #[serde(default)]
    pub module: Vec<Module>,

    #[serde(default)]
    pub gate: Vec<Gate>,

    /// Hook name to shell command
    #[serde(default)]
    pub hooks: BTreeMap<String, String>,
}

impl Declarations {
    /// Parse and validate declarations from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let declarations: Declarations = toml::from_str(content)?;
        declarations.validate()?;
        Ok(declarations)
    }

    /// Read and parse a declarations file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::DeclarationsRead {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(?path, "Loaded declarations");
        Self::parse(&content)
    }

    /// Checks that need more than one entry to decide
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for gate in &self.gate {
            if !seen.insert(gate.name.as_str()) {
                return Err(Error::InvalidDeclarations {
                    reason: format!("duplicate gate '{}'", gate.name),
                });
            }
        }
        self.hook_commands()?;
        Ok(())
    }

    /// Declared hooks, keyed by hook name
    pub fn hook_commands(&self) -> Result<BTreeMap<HookName, String>> {
        self.hooks
            .iter()
            .map(|(name, command)| Ok((name.parse::<HookName>()?, command.clone())))
            .collect()
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.module.push(module);
        self
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate.push(gate);
        self
    }

    pub fn with_capability(mut self, capability: Capability, migration: MigrationPolicy) -> Self {
        self.capability.push(CapabilityDeclaration {
            capability,
            migration,
        });
        self
    }

    pub fn with_root_capability(mut self, name: impl Into<String>) -> Self {
        self.root.capabilities.push(name.into());
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    pub fn without_builtins(mut self) -> Self {
        self.root.builtins = false;
        self
    }
}
