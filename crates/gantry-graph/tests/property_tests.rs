use gantry_graph::{Error, Module, ModuleRegistry};
use proptest::prelude::*;
use std::collections::HashMap;

/// Build a registry of `count` modules where module `i` may only depend on
/// modules with a smaller index, so the graph is always acyclic.
fn acyclic_registry(count: usize, edges: &[(usize, usize)]) -> ModuleRegistry {
    let mut modules: Vec<Module> = (0..count).map(|i| Module::new(format!("m{i:02}"))).collect();
    for &(a, b) in edges {
        let (from, to) = (a % count, b % count);
        if from > to {
            let target = format!("m{to:02}");
            modules[from] = modules[from].clone().depends_on(target);
        }
    }
    let mut registry = ModuleRegistry::new();
    for module in modules {
        registry.register(module).unwrap();
    }
    registry
}

proptest! {
    #[test]
    fn every_module_follows_its_dependencies(
        count in 1usize..24,
        edges in proptest::collection::vec((0usize..64, 0usize..64), 0..80),
    ) {
        let registry = acyclic_registry(count, &edges);
        let order = registry.resolve_dependency_order().unwrap();

        prop_assert_eq!(order.len(), registry.len());

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();
        for module in registry.iter() {
            for dependency in module.edges() {
                prop_assert!(position[dependency.as_str()] < position[module.id.as_str()]);
            }
        }
    }

    #[test]
    fn order_is_deterministic(
        count in 1usize..16,
        edges in proptest::collection::vec((0usize..32, 0usize..32), 0..40),
    ) {
        let registry = acyclic_registry(count, &edges);
        let first = registry.resolve_dependency_order().unwrap();
        let second = registry.resolve_dependency_order().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn any_back_edge_is_a_cycle_error(
        count in 2usize..16,
        edges in proptest::collection::vec((0usize..32, 0usize..32), 0..40),
    ) {
        // Chain every module to its predecessor, then close the loop.
        let mut registry = ModuleRegistry::new();
        for i in 0..count {
            let mut module = Module::new(format!("m{i:02}"));
            if i > 0 {
                module = module.depends_on(format!("m{:02}", i - 1));
            } else {
                module = module.depends_on(format!("m{:02}", count - 1));
            }
            for &(a, b) in &edges {
                if a % count == i && b % count < i {
                    module = module.depends_on(format!("m{:02}", b % count));
                }
            }
            registry.register(module).unwrap();
        }

        match registry.resolve_dependency_order() {
            Err(Error::CycleDetected { members }) => prop_assert!(!members.is_empty()),
            other => prop_assert!(false, "expected a cycle error, got {:?}", other),
        }
    }
}
