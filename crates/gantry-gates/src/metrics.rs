//! Metrics produced by a test run
//!
//! A report carries per-package coverage counters, test counts and any named
//! numeric metrics the test runner chose to export.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "packages": [
//!     { "package": "pub.ihub.demo.rest", "instruction": { "covered": 9, "missed": 1 } }
//!   ],
//!   "tests": { "passed": 12, "failed": 0, "skipped": 1 },
//!   "metrics": { "mutation_score": 0.71 }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coverage counter family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    #[default]
    Instruction,
    Line,
    Branch,
}

impl CounterKind {
    /// Configuration key holding the default minimum for this counter
    pub fn ratio_key(self) -> String {
        format!("verification.{self}_ratio")
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction => write!(f, "instruction"),
            Self::Line => write!(f, "line"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

impl FromStr for CounterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instruction" => Ok(Self::Instruction),
            "line" => Ok(Self::Line),
            "branch" => Ok(Self::Branch),
            other => Err(format!("unknown coverage counter '{other}'")),
        }
    }
}

/// Covered and missed items of one counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub covered: u64,
    pub missed: u64,
}

impl Counter {
    pub fn new(covered: u64, missed: u64) -> Self {
        Self { covered, missed }
    }

    pub fn total(&self) -> u64 {
        self.covered + self.missed
    }
}

impl std::ops::AddAssign for Counter {
    fn add_assign(&mut self, other: Self) {
        self.covered += other.covered;
        self.missed += other.missed;
    }
}

/// Coverage of a single package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCoverage {
    pub package: String,
    #[serde(default)]
    pub instruction: Counter,
    #[serde(default)]
    pub line: Counter,
    #[serde(default)]
    pub branch: Counter,
}

impl PackageCoverage {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn with_counter(mut self, kind: CounterKind, counter: Counter) -> Self {
        match kind {
            CounterKind::Instruction => self.instruction = counter,
            CounterKind::Line => self.line = counter,
            CounterKind::Branch => self.branch = counter,
        }
        self
    }

    pub fn counter(&self, kind: CounterKind) -> Counter {
        match kind {
            CounterKind::Instruction => self.instruction,
            CounterKind::Line => self.line,
            CounterKind::Branch => self.branch,
        }
    }
}

/// Test outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub skipped: u64,
}

/// Everything a test run reports back for gate evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    #[serde(default)]
    pub packages: Vec<PackageCoverage>,
    #[serde(default)]
    pub tests: TestCounts,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl CoverageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: PackageCoverage) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_tests(mut self, passed: u64, failed: u64, skipped: u64) -> Self {
        self.tests = TestCounts {
            passed,
            failed,
            skipped,
        };
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Summed counter over every package not matched by `exclusions`
    pub fn total(&self, kind: CounterKind, exclusions: &[String]) -> Counter {
        let mut total = Counter::default();
        for package in &self.packages {
            if exclusions
                .iter()
                .any(|excluded| is_package_excluded(&package.package, excluded))
            {
                continue;
            }
            total += package.counter(kind);
        }
        total
    }

    /// Covered ratio after exclusions, or `None` when nothing is left to cover
    pub fn ratio(&self, kind: CounterKind, exclusions: &[String]) -> Option<f64> {
        let total = self.total(kind, exclusions);
        if total.total() == 0 {
            return None;
        }
        Some(total.covered as f64 / total.total() as f64)
    }
}

/// Whether `package` is `excluded` or nested below it
pub fn is_package_excluded(package: &str, excluded: &str) -> bool {
    let excluded = excluded.trim_end_matches(".*");
    package
        .strip_prefix(excluded)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
