//! Module registry and dependency ordering
//!
//! The registry owns every declared [`Module`]. Edges point from dependent to
//! dependency: a parent link and an explicit `depends_on` entry both mean
//! "process the target first". [`ModuleRegistry::resolve_dependency_order`]
//! returns modules in dependency-first order.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::module::{Module, ModuleId, ModuleKind};

/// Registry of the modules declared for one run
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateModule` if the identifier is already taken and
    /// `Error::InvalidModuleId` if the identifier is malformed.
    pub fn register(&mut self, module: Module) -> Result<()> {
        module.id.validate()?;
        if self.modules.contains_key(&module.id) {
            return Err(Error::DuplicateModule { id: module.id });
        }
        tracing::debug!(module = %module.id, kind = %module.kind, "Registered module");
        self.modules.insert(module.id.clone(), module);
        Ok(())
    }

    /// Look up a module by identifier
    pub fn get(&self, id: &str) -> Result<&Module> {
        self.modules.get(id).ok_or_else(|| Error::UnknownModule {
            id: ModuleId::from(id),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module identifiers, sorted
    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Direct dependencies of a module (explicit edges plus the parent)
    pub fn dependencies_of(&self, id: &str) -> Result<BTreeSet<ModuleId>> {
        Ok(self.get(id)?.edges().cloned().collect())
    }

    /// Modules that directly depend on `id`
    pub fn dependents_of(&self, id: &str) -> Vec<&ModuleId> {
        self.modules
            .values()
            .filter(|module| module.edges().any(|edge| edge.as_str() == id))
            .map(|module| &module.id)
            .collect()
    }

    /// Every module reachable from `id` through dependency edges
    pub fn transitive_dependencies(&self, id: &str) -> Result<BTreeSet<ModuleId>> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ModuleId> = self.get(id)?.edges().cloned().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(module) = self.modules.get(&next) {
                stack.extend(module.edges().cloned());
            }
        }
        Ok(seen)
    }

    /// Whether neither module depends on the other, directly or transitively
    pub fn are_independent(&self, a: &str, b: &str) -> Result<bool> {
        Ok(!self.transitive_dependencies(a)?.contains(b)
            && !self.transitive_dependencies(b)?.contains(a))
    }

    /// Parent chain of a module, nearest ancestor first.
    ///
    /// Stops at the first repeated or unregistered parent, so it terminates
    /// even on graphs that have not been validated yet.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&Module>> {
        let module = self.get(id)?;
        let mut chain = Vec::new();
        let mut visited = BTreeSet::from([module.id.clone()]);
        let mut next = module.parent.clone();
        while let Some(parent_id) = next {
            if !visited.insert(parent_id.clone()) {
                break;
            }
            match self.modules.get(&parent_id) {
                Some(parent) => {
                    chain.push(parent);
                    next = parent.parent.clone();
                }
                None => break,
            }
        }
        Ok(chain)
    }

    /// Make every module depend on `core`.
    ///
    /// Platform modules, `core` itself and modules `core` already depends on
    /// are left untouched. Returns the number of edges added.
    pub fn apply_implicit_dependency(&mut self, core: &str) -> Result<usize> {
        let core_id = self.get(core)?.id.clone();
        let upstream = self.transitive_dependencies(core)?;
        let mut added = 0;
        for module in self.modules.values_mut() {
            if module.id == core_id
                || module.kind == ModuleKind::Platform
                || upstream.contains(&module.id)
            {
                continue;
            }
            if module.depends_on.insert(core_id.clone()) {
                added += 1;
            }
        }
        tracing::debug!(core = %core_id, added, "Applied implicit dependency");
        Ok(added)
    }

    /// Check that every edge targets a registered module
    pub fn validate_edges(&self) -> Result<()> {
        for module in self.modules.values() {
            for edge in module.edges() {
                if !self.modules.contains_key(edge) {
                    return Err(Error::UnknownDependency {
                        module: module.id.clone(),
                        dependency: edge.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Topologically sort the modules using Kahn's algorithm.
    ///
    /// Returns identifiers in dependency-first order. Ties are broken
    /// alphabetically so the order is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDependency` if an edge targets an unregistered
    /// module and `Error::CycleDetected` naming the members of a cycle. No
    /// partial order is ever returned.
    pub fn resolve_dependency_order(&self) -> Result<Vec<ModuleId>> {
        self.validate_edges()?;

        let mut remaining: BTreeMap<&ModuleId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&ModuleId, Vec<&ModuleId>> = BTreeMap::new();
        for module in self.modules.values() {
            let edges: BTreeSet<&ModuleId> = module.edges().collect();
            remaining.insert(&module.id, edges.len());
            for edge in edges {
                dependents.entry(edge).or_default().push(&module.id);
            }
        }

        let mut ready: BTreeSet<&ModuleId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.modules.len());

        while let Some(current) = ready.pop_first() {
            order.push(current.clone());
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() != self.modules.len() {
            let sorted: BTreeSet<&ModuleId> = order.iter().collect();
            let members = self.find_cycle(&sorted);
            tracing::debug!(?members, "Dependency cycle detected");
            return Err(Error::CycleDetected { members });
        }

        Ok(order)
    }

    /// Walk unsorted modules until one repeats.
    ///
    /// Every module left over by Kahn's algorithm still has an unsorted
    /// dependency, so following those edges always closes a loop.
    fn find_cycle(&self, sorted: &BTreeSet<&ModuleId>) -> Vec<ModuleId> {
        let Some(start) = self.modules.keys().find(|id| !sorted.contains(id)) else {
            return Vec::new();
        };

        let mut path: Vec<ModuleId> = Vec::new();
        let mut current = start.clone();
        loop {
            if let Some(position) = path.iter().position(|id| *id == current) {
                let mut cycle = path.split_off(position);
                // Rotate so the smallest member leads, for stable messages
                if let Some(min_index) = cycle
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.cmp(b.1))
                    .map(|(index, _)| index)
                {
                    cycle.rotate_left(min_index);
                }
                return cycle;
            }
            path.push(current.clone());
            let next = self.modules.get(&current).and_then(|module| {
                module
                    .edges()
                    .filter(|edge| !sorted.contains(edge))
                    .min()
                    .cloned()
            });
            match next {
                Some(next) => current = next,
                None => return path,
            }
        }
    }
}
