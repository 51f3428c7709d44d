//! Run plan: everything decided before any module starts
//!
//! Building a [`Plan`] surfaces every structural error (duplicate or unknown
//! modules, dependency cycles, capability conflicts, invalid gates) up front.
//! After that, per-module work can only fail the module itself.

use gantry_capability::{BindOutcome, Binding, CapabilityRequest, CapabilitySet};
use gantry_config::{ConfigResolver, ConfigScope, EffectiveConfig, InheritMode};
use gantry_gates::GateEngine;
use gantry_graph::{Module, ModuleId, ModuleRegistry};

use crate::declarations::Declarations;
use crate::error::Result;

/// A module with its capabilities bound and configuration resolved
#[derive(Debug, Clone)]
pub struct ConfiguredModule {
    /// Every bind attempt, skipped ones included
    pub outcomes: Vec<BindOutcome>,
    pub bindings: Vec<Binding>,
    pub config: EffectiveConfig,
}

/// Validated, immutable description of one run
#[derive(Debug)]
pub struct Plan {
    registry: ModuleRegistry,
    order: Vec<ModuleId>,
    capabilities: CapabilitySet,
    root_capabilities: Vec<String>,
    scope: ConfigScope,
    engine: GateEngine,
    inherit: InheritMode,
}

impl Plan {
    pub fn build(declarations: &Declarations, inherit: InheritMode) -> Result<Self> {
        let mut registry = ModuleRegistry::new();
        for module in &declarations.module {
            registry.register(module.clone())?;
        }
        if let Some(core) = &declarations.root.implicit_dependency {
            registry.apply_implicit_dependency(core)?;
        }
        let order = registry.resolve_dependency_order()?;

        let mut capabilities = if declarations.root.builtins {
            CapabilitySet::with_builtins()
        } else {
            CapabilitySet::new()
        };
        for declared in &declarations.capability {
            capabilities.define_with_policy(declared.capability.clone(), declared.migration)?;
        }
        for raw in &declarations.root.capabilities {
            let request = CapabilityRequest::parse(raw)?;
            capabilities.get(&request.name)?;
        }

        let engine = GateEngine::new(declarations.gate.clone())?;
        let scope = ConfigScope::new(declarations.defaults.clone());

        tracing::debug!(
            modules = order.len(),
            capabilities = capabilities.len(),
            gates = engine.gates().len(),
            "Built run plan"
        );
        Ok(Self {
            registry,
            order,
            capabilities,
            root_capabilities: declarations.root.capabilities.clone(),
            scope,
            engine,
            inherit,
        })
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Module identifiers, dependencies first
    pub fn order(&self) -> &[ModuleId] {
        &self.order
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn engine(&self) -> &GateEngine {
        &self.engine
    }

    pub fn scope(&self) -> &ConfigScope {
        &self.scope
    }

    pub fn inherit(&self) -> InheritMode {
        self.inherit
    }

    pub fn module(&self, id: &str) -> Result<&Module> {
        Ok(self.registry.get(id)?)
    }

    /// Bind capabilities to `module` and resolve its configuration.
    ///
    /// Reads only the plan, so modules can be configured in any order.
    pub fn configure(&self, module: &Module) -> Result<ConfiguredModule> {
        let outcomes = self.capabilities.bind_all(module, &self.root_capabilities)?;
        for outcome in outcomes.iter().filter(|o| !o.is_applied()) {
            tracing::debug!(module = %module.id, capability = outcome.capability(), "Capability skipped");
        }
        let bindings: Vec<Binding> = outcomes.iter().filter_map(BindOutcome::binding).cloned().collect();

        let config = ConfigResolver::new(&self.scope, &self.registry)
            .with_inherit(self.inherit)
            .resolve(module, &bindings)?;

        Ok(ConfiguredModule {
            outcomes,
            bindings,
            config,
        })
    }
}
