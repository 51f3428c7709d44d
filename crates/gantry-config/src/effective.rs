//! The effective configuration of a single module

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolved configuration of one module, keyed by flat option key.
///
/// Capability options live under `"<capability>.<option>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveConfig {
    values: BTreeMap<String, Value>,
}

impl EffectiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// String entries of a list value; non-string entries are ignored
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge a value under `key`.
    ///
    /// Tables are merged recursively with `value` taking precedence;
    /// anything else replaces the existing value.
    pub fn merge(&mut self, key: &str, value: &Value) {
        match self.values.get_mut(key) {
            Some(existing) => deep_merge_value(existing, value),
            None => {
                self.values.insert(key.to_string(), value.clone());
            }
        }
    }

    /// Remove every key matched by an exclusion pattern.
    ///
    /// A pattern is either an exact key or `prefix.*`, which matches every
    /// key under `prefix.`. Returns the number of keys removed.
    pub fn exclude(&mut self, pattern: &str) -> usize {
        let before = self.values.len();
        match pattern.strip_suffix(".*") {
            Some(prefix) => {
                let prefix = format!("{prefix}.");
                self.values.retain(|key, _| !key.starts_with(&prefix));
            }
            None => {
                self.values.remove(pattern);
            }
        }
        before - self.values.len()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl From<BTreeMap<String, Value>> for EffectiveConfig {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

/// Whether `key` is matched by an exclusion pattern
pub fn is_excluded(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix(".*") {
        Some(prefix) => key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.')),
        None => key == pattern,
    }
}

/// Merge `overlay` into `base`: tables key by key, anything else replaced.
pub(crate) fn deep_merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(table), Value::Object(overlay_table)) => {
            for (key, value) in overlay_table {
                match table.get_mut(key) {
                    Some(existing) => deep_merge_value(existing, value),
                    None => {
                        table.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
