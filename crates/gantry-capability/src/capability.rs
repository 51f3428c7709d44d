//! Capability definitions.
//!
//! # Example TOML
//!
//! ```toml
//! [[capability]]
//! name = "verification"
//! version = "1.0.0"
//! kind = "verification"
//! skip_kinds = ["platform"]
//!
//! [capability.options.instruction_ratio]
//! type = "float"
//! default = 0.0
//! ```

use std::fmt;

use gantry_graph::{Module, ModuleId, ModuleKind};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::ConfigSchema;

/// What a capability does, which decides the collaborator the orchestrator
/// invokes for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    /// Compiles sources into an artifact
    Compile,
    /// Runs tests and collects coverage
    Test,
    /// Contributes verification thresholds
    Verification,
    /// Publishes artifacts
    Publish,
    /// Repackages artifacts (e.g. executable boot jars)
    Package,
    /// Bytecode instrumentation, invoked at bind time
    Instrumentation,
    /// Annotation processing
    AnnotationProcessing,
    /// Checks over the module's source tree, such as license headers
    SourceCheck,
    /// Configuration only
    #[default]
    Generic,
}

impl CapabilityKind {
    /// Kinds handed to the instrumenter as soon as the module is configured
    pub fn runs_at_bind(self) -> bool {
        matches!(
            self,
            Self::Instrumentation | Self::AnnotationProcessing | Self::SourceCheck
        )
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compile => "compile",
            Self::Test => "test",
            Self::Verification => "verification",
            Self::Publish => "publish",
            Self::Package => "package",
            Self::Instrumentation => "instrumentation",
            Self::AnnotationProcessing => "annotation-processing",
            Self::SourceCheck => "source-check",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Predicate deciding whether a capability applies to a module.
///
/// All present conditions must hold. An empty predicate applies everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    /// Module kinds the capability never applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_kinds: Vec<ModuleKind>,
    /// When non-empty, only these modules qualify
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only_modules: Vec<ModuleId>,
    /// Modules the capability never applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except_modules: Vec<ModuleId>,
}

impl Applicability {
    /// Applies to every module
    pub fn always() -> Self {
        Self::default()
    }

    /// Applies to every module not of one of the given kinds
    pub fn skip_kinds(kinds: impl IntoIterator<Item = ModuleKind>) -> Self {
        Self {
            skip_kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn applies_to(&self, module: &Module) -> bool {
        if self.skip_kinds.contains(&module.kind) {
            return false;
        }
        if !self.only_modules.is_empty() && !self.only_modules.contains(&module.id) {
            return false;
        }
        !self.except_modules.contains(&module.id)
    }
}

/// A named, versioned unit of build behaviour.
///
/// Capabilities are immutable once defined and shared between every module
/// bound to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub version: semver::Version,
    #[serde(default)]
    pub kind: CapabilityKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Option schema, keyed by option name
    #[serde(default)]
    pub options: ConfigSchema,
    #[serde(flatten)]
    pub applicability: Applicability,
}

impl Capability {
    pub fn new(name: impl Into<String>, version: semver::Version, kind: CapabilityKind) -> Self {
        Self {
            name: name.into(),
            version,
            kind,
            description: None,
            options: ConfigSchema::new(),
            applicability: Applicability::always(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.options = schema;
        self
    }

    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Check the capability name: lowercase alphanumerics and `-`/`_`.
    ///
    /// Names become the namespace of configuration keys, so `.` is refused.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName {
                name: name.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_')))
        {
            return Err(Error::InvalidName {
                name: name.to_string(),
                reason: format!("contains invalid character '{bad}'"),
            });
        }
        Ok(())
    }

    /// Configuration key of one of this capability's options
    pub fn option_key(&self, option: &str) -> String {
        format!("{}.{}", self.name, option)
    }
}

/// A module's request for a capability, e.g. `"verification@>=1.0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest {
    pub name: String,
    pub requirement: Option<semver::VersionReq>,
}

impl CapabilityRequest {
    pub fn parse(request: &str) -> Result<Self> {
        let request = request.trim();
        let (name, requirement) = match request.split_once('@') {
            Some((name, requirement)) => {
                let requirement = semver::VersionReq::parse(requirement.trim()).map_err(|e| {
                    Error::InvalidRequest {
                        request: request.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                (name.trim(), Some(requirement))
            }
            None => (request, None),
        };
        Capability::validate_name(name).map_err(|e| Error::InvalidRequest {
            request: request.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name: name.to_string(),
            requirement,
        })
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement: None,
        }
    }
}

impl fmt::Display for CapabilityRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.requirement {
            Some(requirement) => write!(f, "{}@{}", self.name, requirement),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applicability_skips_platform_modules() {
        let predicate = Applicability::skip_kinds([ModuleKind::Platform]);
        let bom = Module::new("bom").with_kind(ModuleKind::Platform);
        let lib = Module::new("core");
        assert!(!predicate.applies_to(&bom));
        assert!(predicate.applies_to(&lib));
    }

    #[test]
    fn bind_time_kinds() {
        assert!(CapabilityKind::Instrumentation.runs_at_bind());
        assert!(CapabilityKind::AnnotationProcessing.runs_at_bind());
        assert!(CapabilityKind::SourceCheck.runs_at_bind());
        assert!(!CapabilityKind::Compile.runs_at_bind());
        assert!(!CapabilityKind::Generic.runs_at_bind());
    }

    #[test]
    fn applicability_only_and_except() {
        let predicate = Applicability {
            only_modules: vec![ModuleId::from("rest"), ModuleId::from("client")],
            except_modules: vec![ModuleId::from("client")],
            ..Applicability::default()
        };
        assert!(predicate.applies_to(&Module::new("rest")));
        assert!(!predicate.applies_to(&Module::new("client")));
        assert!(!predicate.applies_to(&Module::new("service")));
    }

    #[test]
    fn request_with_requirement() {
        let request = CapabilityRequest::parse("verification@>=1.2").unwrap();
        assert_eq!(request.name, "verification");
        let requirement = request.requirement.unwrap();
        assert!(requirement.matches(&semver::Version::new(1, 3, 0)));
        assert!(!requirement.matches(&semver::Version::new(1, 1, 0)));
    }

    #[test]
    fn request_without_requirement() {
        let request = CapabilityRequest::parse(" java ").unwrap();
        assert_eq!(request, CapabilityRequest::named("java"));
        assert_eq!(request.to_string(), "java");
    }

    #[test]
    fn request_rejects_bad_input() {
        assert!(CapabilityRequest::parse("java@not-a-version").is_err());
        assert!(CapabilityRequest::parse("Java.Compile").is_err());
        assert!(CapabilityRequest::parse("").is_err());
    }

    #[test]
    fn capability_parses_from_toml() {
        let toml_str = r#"
name = "verification"
version = "1.0.0"
kind = "verification"
skip_kinds = ["platform"]

[options.instruction_ratio]
type = "float"
default = 0.0
"#;
        let capability: Capability = toml::from_str(toml_str).unwrap();
        assert_eq!(capability.name, "verification");
        assert_eq!(capability.kind, CapabilityKind::Verification);
        assert_eq!(capability.applicability.skip_kinds, vec![ModuleKind::Platform]);
        assert_eq!(capability.options.len(), 1);
        assert_eq!(capability.option_key("instruction_ratio"), "verification.instruction_ratio");
    }
}
