//! Root configuration scope
//!
//! The scope holds the workspace-wide defaults every module starts from. It
//! is built once per run and only ever read afterwards.
//!
//! # Example TOML
//!
//! ```toml
//! [defaults]
//! "doc.encoding" = "UTF-8"
//! "java.source_compatibility" = "17"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How far module overrides are inherited down the parent chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritMode {
    /// Modules see only the root defaults and their own overrides
    #[default]
    None,
    /// The direct parent's overrides apply beneath the module's own
    Parent,
    /// Every ancestor's overrides apply, farthest first
    Ancestors,
}

impl fmt::Display for InheritMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Parent => write!(f, "parent"),
            Self::Ancestors => write!(f, "ancestors"),
        }
    }
}

impl FromStr for InheritMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "parent" => Ok(Self::Parent),
            "ancestors" => Ok(Self::Ancestors),
            other => Err(format!("unknown inherit mode '{other}'")),
        }
    }
}

/// Read-only root defaults shared by every module of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigScope {
    defaults: BTreeMap<String, Value>,
}

impl ConfigScope {
    pub fn new(defaults: BTreeMap<String, Value>) -> Self {
        Self { defaults }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.defaults.get(key)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.defaults.iter()
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}
