//! Gate declarations and checks
//!
//! # Example TOML
//!
//! ```toml
//! [[gate]]
//! name = "instruction-coverage"
//! transition = "built->verified"
//! severity = "blocking"
//! capability = "verification"
//!
//! [gate.check]
//! type = "coverage"
//! counter = "instruction"
//! exclusions = ["pub.ihub.demo.rest"]
//! ```

use std::collections::BTreeSet;
use std::fmt;

use gantry_config::EffectiveConfig;
use gantry_graph::{Module, ModuleId, Transition};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::{CounterKind, CoverageMetrics};

/// Configuration key merged into every coverage gate's exclusions
pub const PACKAGE_EXCLUSIONS_KEY: &str = "verification.package_exclusions";

/// Whether a failing gate stops the transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Blocking,
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Advisory => write!(f, "advisory"),
        }
    }
}

/// The predicate a gate evaluates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GateCheck {
    /// Covered ratio of a counter, after package exclusions, must reach a
    /// minimum. Without an explicit minimum the module's
    /// `verification.<counter>_ratio` setting is used.
    Coverage {
        #[serde(default)]
        counter: CounterKind,
        #[serde(default)]
        minimum: Option<f64>,
        #[serde(default)]
        exclusions: Vec<String>,
    },
    /// Tests ran and none failed
    TestsPassed,
    /// A named metric must reach a minimum
    Metric { name: String, minimum: f64 },
}

/// Facts a gate is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub module: &'a Module,
    pub config: &'a EffectiveConfig,
    /// Names of the capabilities applied to the module
    pub bound: &'a BTreeSet<String>,
    /// Metrics from the test run, if one happened
    pub metrics: Option<&'a CoverageMetrics>,
}

/// A validation check guarding one lifecycle transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gate {
    pub name: String,
    pub transition: Transition,
    #[serde(default)]
    pub severity: Severity,
    /// Restrict the gate to these modules (all modules when empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleId>,
    /// Restrict the gate to modules with this capability applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    pub check: GateCheck,
}

impl Gate {
    pub fn new(name: impl Into<String>, transition: Transition, check: GateCheck) -> Self {
        Self {
            name: name.into(),
            transition,
            severity: Severity::default(),
            modules: Vec::new(),
            capability: None,
            check,
        }
    }

    pub fn advisory(mut self) -> Self {
        self.severity = Severity::Advisory;
        self
    }

    pub fn for_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(ModuleId::new(module));
        self
    }

    pub fn requiring_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }

    pub fn validate(&self) -> Result<()> {
        if !self.transition.is_forward_step() {
            return Err(Error::InvalidGate {
                gate: self.name.clone(),
                reason: format!("{} is not a lifecycle step", self.transition),
            });
        }
        let minimum = match &self.check {
            GateCheck::Coverage { minimum, .. } => *minimum,
            GateCheck::Metric { minimum, .. } => Some(*minimum),
            GateCheck::TestsPassed => None,
        };
        if let Some(minimum) = minimum {
            if !minimum.is_finite() {
                return Err(Error::InvalidGate {
                    gate: self.name.clone(),
                    reason: "minimum must be a finite number".to_string(),
                });
            }
        }
        if let GateCheck::Coverage {
            minimum: Some(minimum),
            ..
        } = &self.check
        {
            if !(0.0..=1.0).contains(minimum) {
                return Err(Error::InvalidGate {
                    gate: self.name.clone(),
                    reason: format!("coverage minimum {minimum} is outside 0..=1"),
                });
            }
        }
        Ok(())
    }

    /// Whether the gate's scope includes this module
    pub fn applies_to(&self, module: &Module, bound: &BTreeSet<String>) -> bool {
        if !self.modules.is_empty() && !self.modules.contains(&module.id) {
            return false;
        }
        match &self.capability {
            Some(capability) => bound.contains(capability),
            None => true,
        }
    }

    /// Run the check, returning the failure reason if it does not pass
    pub fn evaluate(&self, ctx: &GateContext<'_>) -> std::result::Result<(), String> {
        match &self.check {
            GateCheck::Coverage {
                counter,
                minimum,
                exclusions,
            } => evaluate_coverage(ctx, *counter, *minimum, exclusions),
            GateCheck::TestsPassed => {
                let metrics = ctx
                    .metrics
                    .ok_or_else(|| "no test results were produced".to_string())?;
                if metrics.tests.failed > 0 {
                    return Err(format!("{} test(s) failed", metrics.tests.failed));
                }
                Ok(())
            }
            GateCheck::Metric { name, minimum } => {
                let value = ctx
                    .metrics
                    .and_then(|m| m.metrics.get(name))
                    .ok_or_else(|| format!("metric '{name}' was not reported"))?;
                if *value < *minimum {
                    return Err(format!("{name} {value} is below minimum {minimum}"));
                }
                Ok(())
            }
        }
    }
}

fn evaluate_coverage(
    ctx: &GateContext<'_>,
    counter: CounterKind,
    minimum: Option<f64>,
    exclusions: &[String],
) -> std::result::Result<(), String> {
    let metrics = ctx
        .metrics
        .ok_or_else(|| "no coverage metrics were produced".to_string())?;
    let minimum = minimum
        .or_else(|| ctx.config.get_f64(&counter.ratio_key()))
        .ok_or_else(|| format!("no minimum configured for {counter} coverage"))?;

    let mut excluded: Vec<String> = exclusions.to_vec();
    excluded.extend(ctx.config.get_string_list(PACKAGE_EXCLUSIONS_KEY));

    let Some(ratio) = metrics.ratio(counter, &excluded) else {
        tracing::debug!(module = %ctx.module.id, %counter, "Nothing to cover after exclusions");
        return Ok(());
    };
    if ratio < minimum {
        return Err(format!(
            "{counter} coverage {ratio:.2} is below minimum {minimum:.2}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Counter, PackageCoverage};
    use gantry_graph::LifecycleState;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn verify() -> Transition {
        Transition::new(LifecycleState::Built, LifecycleState::Verified)
    }

    fn coverage(minimum: Option<f64>) -> Gate {
        Gate::new(
            "coverage",
            verify(),
            GateCheck::Coverage {
                counter: CounterKind::Instruction,
                minimum,
                exclusions: Vec::new(),
            },
        )
    }

    fn metrics(covered: u64, missed: u64) -> CoverageMetrics {
        CoverageMetrics::new().with_package(
            PackageCoverage::new("pub.ihub.demo.service")
                .with_counter(CounterKind::Instruction, Counter::new(covered, missed)),
        )
    }

    fn check(gate: &Gate, config: &EffectiveConfig, metrics: Option<&CoverageMetrics>) -> std::result::Result<(), String> {
        let module = Module::new("service");
        let bound = BTreeSet::new();
        gate.evaluate(&GateContext {
            module: &module,
            config,
            bound: &bound,
            metrics,
        })
    }

    #[test]
    fn coverage_uses_explicit_minimum() {
        let config = EffectiveConfig::new();
        assert!(check(&coverage(Some(0.5)), &config, Some(&metrics(5, 5))).is_ok());
        let reason = check(&coverage(Some(0.5)), &config, Some(&metrics(4, 6))).unwrap_err();
        assert_eq!(reason, "instruction coverage 0.40 is below minimum 0.50");
    }

    #[test]
    fn coverage_falls_back_to_configured_ratio() {
        let config = EffectiveConfig::from(BTreeMap::from([(
            "verification.instruction_ratio".to_string(),
            json!(0.8),
        )]));
        assert!(check(&coverage(None), &config, Some(&metrics(7, 3))).is_err());
        assert!(check(&coverage(None), &config, Some(&metrics(8, 2))).is_ok());
    }

    #[test]
    fn coverage_without_minimum_fails() {
        let config = EffectiveConfig::new();
        let reason = check(&coverage(None), &config, Some(&metrics(8, 2))).unwrap_err();
        assert!(reason.contains("no minimum"), "{reason}");
    }

    #[test]
    fn coverage_merges_configured_exclusions() {
        let config = EffectiveConfig::from(BTreeMap::from([(
            PACKAGE_EXCLUSIONS_KEY.to_string(),
            json!(["pub.ihub.demo.service"]),
        )]));
        // Every package is excluded, so there is nothing to cover
        assert!(check(&coverage(Some(0.9)), &config, Some(&metrics(0, 10))).is_ok());
    }

    #[test]
    fn missing_metrics_fail_every_check() {
        let config = EffectiveConfig::new();
        assert!(check(&coverage(Some(0.1)), &config, None).is_err());
        let tests = Gate::new("tests", verify(), GateCheck::TestsPassed);
        assert!(check(&tests, &config, None).is_err());
    }

    #[test]
    fn tests_passed_counts_failures() {
        let config = EffectiveConfig::new();
        let gate = Gate::new("tests", verify(), GateCheck::TestsPassed);
        let failing = CoverageMetrics::new().with_tests(3, 2, 0);
        assert_eq!(check(&gate, &config, Some(&failing)).unwrap_err(), "2 test(s) failed");
        let passing = CoverageMetrics::new().with_tests(3, 0, 1);
        assert!(check(&gate, &config, Some(&passing)).is_ok());
    }

    #[test]
    fn metric_gate() {
        let config = EffectiveConfig::new();
        let gate = Gate::new(
            "mutation",
            verify(),
            GateCheck::Metric {
                name: "mutation_score".to_string(),
                minimum: 0.6,
            },
        );
        let low = CoverageMetrics::new().with_metric("mutation_score", 0.5);
        assert!(check(&gate, &config, Some(&low)).is_err());
        let high = CoverageMetrics::new().with_metric("mutation_score", 0.7);
        assert!(check(&gate, &config, Some(&high)).is_ok());
        assert!(check(&gate, &config, Some(&CoverageMetrics::new())).is_err());
    }

    #[test]
    fn scope_by_module_and_capability() {
        let gate = coverage(Some(0.5)).for_module("rest").requiring_capability("verification");
        let rest = Module::new("rest");
        let other = Module::new("client");
        let bound = BTreeSet::from(["verification".to_string()]);
        assert!(gate.applies_to(&rest, &bound));
        assert!(!gate.applies_to(&other, &bound));
        assert!(!gate.applies_to(&rest, &BTreeSet::new()));
    }

    #[test]
    fn validate_rejects_skipping_transitions_and_bad_minimums() {
        let skip = Gate::new(
            "skip",
            Transition::new(LifecycleState::Configured, LifecycleState::Published),
            GateCheck::TestsPassed,
        );
        assert!(skip.validate().is_err());
        assert!(coverage(Some(1.5)).validate().is_err());
        assert!(coverage(Some(0.5)).validate().is_ok());
    }

    #[test]
    fn parse_gate_from_toml() {
        let toml_str = r#"
name = "instruction-coverage"
transition = "built->verified"
severity = "advisory"
capability = "verification"

[check]
type = "coverage"
counter = "branch"
minimum = 0.5
exclusions = ["pub.ihub.demo.rest"]
"#;
        let gate: Gate = toml::from_str(toml_str).unwrap();
        assert_eq!(gate.severity, Severity::Advisory);
        assert_eq!(gate.transition, verify());
        assert_eq!(
            gate.check,
            GateCheck::Coverage {
                counter: CounterKind::Branch,
                minimum: Some(0.5),
                exclusions: vec!["pub.ihub.demo.rest".to_string()],
            }
        );
    }
}
