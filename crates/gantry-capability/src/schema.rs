//! Configuration schemas declared by capabilities.
//!
//! A schema maps option names to an expected type and an optional default.
//!
//! # Example TOML
//!
//! ```toml
//! [capability.options.instruction_ratio]
//! type = "float"
//! default = 0.0
//!
//! [capability.options.package_exclusions]
//! type = "list"
//! default = []
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected type of a capability option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    String,
    Integer,
    /// Any number; integers are accepted where a float is expected.
    Float,
    Boolean,
    List,
    Table,
}

impl OptionType {
    /// Whether `value` is acceptable for this type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Table => value.is_object(),
        }
    }

    /// Short name of the JSON type of `value`, for error messages.
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "table",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Table => "table",
        };
        f.write_str(name)
    }
}

/// Declaration of a single option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl OptionSpec {
    pub fn new(option_type: OptionType) -> Self {
        Self {
            option_type,
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Mapping of option name to its definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSchema {
    options: BTreeMap<String, OptionSpec>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, name: impl Into<String>, spec: OptionSpec) -> Self {
        self.options.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionSpec)> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Options that declare a default value.
    pub fn defaults(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.options
            .iter()
            .filter_map(|(name, spec)| spec.default.as_ref().map(|value| (name, value)))
    }

    /// Check a single option against the schema.
    ///
    /// Returns a human-readable reason on failure.
    pub fn check(&self, key: &str, value: &Value) -> std::result::Result<(), String> {
        let spec = self
            .options
            .get(key)
            .ok_or_else(|| "unknown option".to_string())?;
        if spec.option_type.matches(value) {
            Ok(())
        } else {
            Err(format!(
                "expected {}, found {}",
                spec.option_type,
                OptionType::describe(value)
            ))
        }
    }
}
