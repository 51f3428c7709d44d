//! The set of capabilities defined for a run.
//!
//! Capabilities are defined once and shared between modules. Defining the same
//! name and version twice is a no-op; any other redefinition is governed by a
//! [`MigrationPolicy`].

use std::collections::BTreeMap;
use std::sync::Arc;

use gantry_graph::Module;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::{BindOutcome, Binding};
use crate::capability::{Capability, CapabilityRequest};
use crate::error::{Error, Result};

/// How to treat a definition whose name exists with another version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPolicy {
    /// Refuse with `CapabilityVersionConflict`
    #[default]
    Reject,
    /// Accept strictly newer versions only
    Upgrade,
    /// Accept any version
    Replace,
}

/// Defined capabilities, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    capabilities: BTreeMap<String, Arc<Capability>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a capability under the default `Reject` policy.
    pub fn define(&mut self, capability: Capability) -> Result<Arc<Capability>> {
        self.define_with_policy(capability, MigrationPolicy::Reject)
    }

    /// Define a capability, resolving version clashes with `policy`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidName` for a malformed name and
    /// `Error::CapabilityVersionConflict` when the policy refuses the version.
    pub fn define_with_policy(
        &mut self,
        capability: Capability,
        policy: MigrationPolicy,
    ) -> Result<Arc<Capability>> {
        Capability::validate_name(&capability.name)?;

        if let Some(existing) = self.capabilities.get(&capability.name) {
            if existing.version == capability.version {
                tracing::debug!(
                    capability = %capability.name,
                    version = %capability.version,
                    "Capability already defined"
                );
                return Ok(Arc::clone(existing));
            }
            let accepted = match policy {
                MigrationPolicy::Reject => false,
                MigrationPolicy::Upgrade => capability.version > existing.version,
                MigrationPolicy::Replace => true,
            };
            if !accepted {
                return Err(Error::CapabilityVersionConflict {
                    name: capability.name,
                    existing: existing.version.clone(),
                    requested: capability.version,
                });
            }
            tracing::info!(
                capability = %capability.name,
                from = %existing.version,
                to = %capability.version,
                ?policy,
                "Migrated capability"
            );
        }

        let capability = Arc::new(capability);
        self.capabilities
            .insert(capability.name.clone(), Arc::clone(&capability));
        Ok(capability)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<Capability>> {
        self.capabilities
            .get(name)
            .ok_or_else(|| Error::UnknownCapability {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Defined capability names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Capability>> {
        self.capabilities.values()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Bind one capability to a module.
    ///
    /// Exclusions and the applicability predicate produce skip outcomes, not
    /// errors. The module itself is never modified.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownCapability` if the name is not defined
    /// * `Error::CapabilityVersionMismatch` if the request's requirement is
    ///   not satisfied by the defined version
    /// * `Error::SchemaValidation` on an unknown option or a type mismatch
    pub fn bind(
        &self,
        module: &Module,
        request: &CapabilityRequest,
        options: &BTreeMap<String, Value>,
    ) -> Result<BindOutcome> {
        let capability = self.get(&request.name)?;

        if module.excludes_capability(&capability.name) {
            tracing::debug!(module = %module.id, capability = %capability.name, "Skipped by exclusion");
            return Ok(BindOutcome::SkippedByExclusion {
                capability: capability.name.clone(),
            });
        }

        if !capability.applicability.applies_to(module) {
            tracing::debug!(module = %module.id, capability = %capability.name, "Skipped by predicate");
            return Ok(BindOutcome::SkippedByPredicate {
                capability: capability.name.clone(),
            });
        }

        if let Some(requirement) = &request.requirement {
            if !requirement.matches(&capability.version) {
                return Err(Error::CapabilityVersionMismatch {
                    name: capability.name.clone(),
                    version: capability.version.clone(),
                    requirement: requirement.to_string(),
                });
            }
        }

        for (key, value) in options {
            capability
                .options
                .check(key, value)
                .map_err(|reason| Error::SchemaValidation {
                    capability: capability.name.clone(),
                    key: key.clone(),
                    reason,
                })?;
        }

        tracing::debug!(module = %module.id, capability = %capability.name, "Bound capability");
        Ok(BindOutcome::Applied(Binding::new(
            Arc::clone(capability),
            options.clone(),
        )))
    }

    /// Bind the root capabilities followed by the module's own requests.
    ///
    /// A name requested both at the root and by the module is bound once,
    /// using the module's version requirement. Options come from the
    /// module's `options.<capability>` table; a table naming a capability
    /// that is not requested is refused with `Error::UnrequestedOptions`.
    pub fn bind_all(&self, module: &Module, root: &[String]) -> Result<Vec<BindOutcome>> {
        let mut requests: Vec<CapabilityRequest> = Vec::new();
        for raw in root.iter().chain(module.capabilities.iter()) {
            let request = CapabilityRequest::parse(raw)?;
            match requests.iter_mut().find(|r| r.name == request.name) {
                Some(existing) => {
                    if request.requirement.is_some() {
                        existing.requirement = request.requirement;
                    }
                }
                None => requests.push(request),
            }
        }

        let empty = BTreeMap::new();
        let outcomes = requests
            .iter()
            .map(|request| {
                let options = module.options.get(&request.name).unwrap_or(&empty);
                self.bind(module, request, options)
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(stray) = module
            .options
            .keys()
            .find(|name| !requests.iter().any(|request| &request.name == *name))
        {
            return Err(Error::UnrequestedOptions {
                module: module.id.to_string(),
                capability: stray.clone(),
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Applicability, CapabilityKind};
    use crate::schema::{ConfigSchema, OptionSpec, OptionType};
    use gantry_graph::ModuleKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn version(s: &str) -> semver::Version {
        semver::Version::parse(s).unwrap()
    }

    fn verification(v: &str) -> Capability {
        Capability::new("verification", version(v), CapabilityKind::Verification)
            .with_schema(
                ConfigSchema::new().with_option(
                    "instruction_ratio",
                    OptionSpec::new(OptionType::Float).with_default(json!(0.0)),
                ),
            )
            .with_applicability(Applicability::skip_kinds([ModuleKind::Platform]))
    }

    #[test]
    fn redefining_same_version_is_noop() {
        let mut set = CapabilitySet::new();
        let first = set.define(verification("1.0.0")).unwrap();
        let second = set.define(verification("1.0.0")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn redefining_other_version_conflicts() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        let err = set.define(verification("2.0.0")).unwrap_err();
        assert_eq!(
            err,
            Error::CapabilityVersionConflict {
                name: "verification".to_string(),
                existing: version("1.0.0"),
                requested: version("2.0.0"),
            }
        );
        assert_eq!(set.get("verification").unwrap().version, version("1.0.0"));
    }

    #[test]
    fn upgrade_policy_accepts_only_newer() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.2.0")).unwrap();
        assert!(
            set.define_with_policy(verification("1.1.0"), MigrationPolicy::Upgrade)
                .is_err()
        );
        set.define_with_policy(verification("1.3.0"), MigrationPolicy::Upgrade)
            .unwrap();
        assert_eq!(set.get("verification").unwrap().version, version("1.3.0"));
    }

    #[test]
    fn replace_policy_accepts_any() {
        let mut set = CapabilitySet::new();
        set.define(verification("2.0.0")).unwrap();
        set.define_with_policy(verification("1.0.0"), MigrationPolicy::Replace)
            .unwrap();
        assert_eq!(set.get("verification").unwrap().version, version("1.0.0"));
    }

    #[test]
    fn bind_unknown_capability_fails() {
        let set = CapabilitySet::new();
        let module = Module::new("core");
        let err = set
            .bind(&module, &CapabilityRequest::named("ghost"), &BTreeMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnknownCapability {
                name: "ghost".to_string()
            }
        );
    }

    #[test]
    fn bind_skips_platform_modules() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        let bom = Module::new("bom").with_kind(ModuleKind::Platform);
        let outcome = set
            .bind(&bom, &CapabilityRequest::named("verification"), &BTreeMap::new())
            .unwrap();
        assert_eq!(
            outcome,
            BindOutcome::SkippedByPredicate {
                capability: "verification".to_string()
            }
        );
    }

    #[test]
    fn bind_honours_exclusion() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        let module = Module::new("demo").with_exclusion("capability:verification");
        let outcome = set
            .bind(&module, &CapabilityRequest::named("verification"), &BTreeMap::new())
            .unwrap();
        assert!(matches!(outcome, BindOutcome::SkippedByExclusion { .. }));
    }

    #[test]
    fn bind_checks_version_requirement() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        let module = Module::new("core");
        let request = CapabilityRequest::parse("verification@>=1.2").unwrap();
        let err = set.bind(&module, &request, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::CapabilityVersionMismatch { .. }));
    }

    #[test]
    fn bind_validates_options() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        let module = Module::new("core");
        let request = CapabilityRequest::named("verification");

        let bad_type = BTreeMap::from([("instruction_ratio".to_string(), json!("high"))]);
        let err = set.bind(&module, &request, &bad_type).unwrap_err();
        assert_eq!(
            err,
            Error::SchemaValidation {
                capability: "verification".to_string(),
                key: "instruction_ratio".to_string(),
                reason: "expected float, found string".to_string(),
            }
        );

        let unknown = BTreeMap::from([("ratio".to_string(), json!(0.5))]);
        assert!(set.bind(&module, &request, &unknown).is_err());

        let good = BTreeMap::from([("instruction_ratio".to_string(), json!(0.5))]);
        let outcome = set.bind(&module, &request, &good).unwrap();
        let binding = outcome.binding().unwrap();
        assert_eq!(binding.option("instruction_ratio"), Some(&json!(0.5)));
    }

    #[test]
    fn bind_all_merges_root_and_module_requests() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.3.0")).unwrap();
        set.define(Capability::new("java", version("1.0.0"), CapabilityKind::Compile))
            .unwrap();

        let module = Module::new("core")
            .with_capability("verification@>=1.2")
            .with_option("verification", "instruction_ratio", json!(0.4));
        let root = vec!["java".to_string(), "verification".to_string()];

        let outcomes = set.bind_all(&module, &root).unwrap();
        let names: Vec<&str> = outcomes.iter().map(BindOutcome::capability).collect();
        assert_eq!(names, vec!["java", "verification"]);
        assert_eq!(
            outcomes[1].binding().unwrap().options["instruction_ratio"],
            json!(0.4)
        );
    }

    #[test]
    fn names_are_sorted() {
        let mut set = CapabilitySet::new();
        set.define(verification("1.0.0")).unwrap();
        set.define(Capability::new("boot", version("1.0.0"), CapabilityKind::Package))
            .unwrap();
        assert_eq!(set.names(), vec!["boot", "verification"]);
    }
}
