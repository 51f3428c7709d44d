//! Per-module configuration resolution
//!
//! The `ConfigResolver` computes a module's effective configuration from the
//! layers below, later layers overriding earlier ones:
//!
//! 1. Root defaults from the [`ConfigScope`]
//! 2. Defaults declared by every bound capability (`cap.option`)
//! 3. Inherited ancestor overrides (per [`InheritMode`], farthest first)
//! 4. The module's own overrides
//! 5. Binding options (`cap.option`)
//!
//! Module exclusions are applied last and always win. Resolution only reads
//! its inputs, so resolving modules in any order gives the same results.

use gantry_capability::{Binding, OptionType};
use gantry_graph::{Module, ModuleRegistry};

use crate::effective::EffectiveConfig;
use crate::error::{Error, Result};
use crate::scope::{ConfigScope, InheritMode};

/// Exclusion entries with this prefix name capabilities, not keys
const CAPABILITY_EXCLUSION_PREFIX: &str = "capability:";

/// Resolves module configuration against a root scope and the module graph
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver<'a> {
    scope: &'a ConfigScope,
    registry: &'a ModuleRegistry,
    inherit: InheritMode,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(scope: &'a ConfigScope, registry: &'a ModuleRegistry) -> Self {
        Self {
            scope,
            registry,
            inherit: InheritMode::default(),
        }
    }

    pub fn with_inherit(mut self, inherit: InheritMode) -> Self {
        self.inherit = inherit;
        self
    }

    pub fn inherit(&self) -> InheritMode {
        self.inherit
    }

    /// Resolve the effective configuration of `module` with its bindings.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigType` if a namespaced value does not match the
    /// type its capability declares, and `Error::Graph` if the module's
    /// parent chain cannot be read from the registry.
    pub fn resolve(&self, module: &Module, bindings: &[Binding]) -> Result<EffectiveConfig> {
        let mut config = EffectiveConfig::new();

        for (key, value) in self.scope.defaults() {
            config.merge(key, value);
        }
        tracing::debug!(module = %module.id, keys = config.len(), "Applied root defaults");

        for binding in bindings {
            for (option, value) in binding.capability.options.defaults() {
                config.merge(&binding.capability.option_key(option), value);
            }
        }
        tracing::debug!(module = %module.id, bindings = bindings.len(), "Applied capability defaults");

        for ancestor in self.inherited_from(module)? {
            for (key, value) in &ancestor.overrides {
                config.merge(key, value);
            }
            tracing::debug!(module = %module.id, ancestor = %ancestor.id, "Applied inherited overrides");
        }

        for (key, value) in &module.overrides {
            config.merge(key, value);
        }

        for binding in bindings {
            for (key, value) in binding.namespaced_options() {
                config.merge(&key, value);
            }
        }

        for pattern in &module.exclusions {
            if pattern.starts_with(CAPABILITY_EXCLUSION_PREFIX) {
                continue;
            }
            let removed = config.exclude(pattern);
            tracing::debug!(module = %module.id, %pattern, removed, "Applied exclusion");
        }

        check_types(&config, bindings)?;
        Ok(config)
    }

    /// Ancestors whose overrides apply to `module`, farthest first
    fn inherited_from(&self, module: &Module) -> Result<Vec<&'a Module>> {
        let mut chain = match self.inherit {
            InheritMode::None => return Ok(Vec::new()),
            InheritMode::Parent => {
                let mut chain = self.registry.ancestors(module.id.as_str())?;
                chain.truncate(1);
                chain
            }
            InheritMode::Ancestors => self.registry.ancestors(module.id.as_str())?,
        };
        chain.reverse();
        Ok(chain)
    }
}

fn check_types(config: &EffectiveConfig, bindings: &[Binding]) -> Result<()> {
    for binding in bindings {
        for (option, spec) in binding.capability.options.iter() {
            let key = binding.capability.option_key(option);
            if let Some(value) = config.get(&key) {
                if !spec.option_type.matches(value) {
                    return Err(Error::ConfigType {
                        key,
                        expected: spec.option_type.to_string(),
                        found: OptionType::describe(value).to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
