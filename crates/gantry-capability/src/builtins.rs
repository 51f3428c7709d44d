//! Built-in capability catalog.
//!
//! These mirror the conventions of a typical JVM multi-module build: compile,
//! test, coverage verification, publishing, boot packaging, bytecode
//! instrumentation, annotation processing and license header checks. All of
//! them skip platform modules, which only aggregate versions.

use gantry_graph::ModuleKind;
use serde_json::json;

use crate::capability::{Applicability, Capability, CapabilityKind};
use crate::schema::{ConfigSchema, OptionSpec, OptionType};
use crate::set::CapabilitySet;

fn builtin(name: &str, kind: CapabilityKind, description: &str, schema: ConfigSchema) -> Capability {
    Capability::new(name, semver::Version::new(1, 0, 0), kind)
        .with_description(description)
        .with_schema(schema)
        .with_applicability(Applicability::skip_kinds([ModuleKind::Platform]))
}

fn string(default: Option<&str>, description: &str) -> OptionSpec {
    let spec = OptionSpec::new(OptionType::String).with_description(description);
    match default {
        Some(value) => spec.with_default(json!(value)),
        None => spec,
    }
}

/// Every built-in capability, sorted by name.
pub fn builtin_capabilities() -> Vec<Capability> {
    vec![
        builtin(
            "annotation-processing",
            CapabilityKind::AnnotationProcessing,
            "Compile-time annotation processors",
            ConfigSchema::new().with_option(
                "processors",
                OptionSpec::new(OptionType::List)
                    .with_default(json!([]))
                    .with_description("Processor class names"),
            ),
        ),
        builtin(
            "boot",
            CapabilityKind::Package,
            "Executable application packaging",
            ConfigSchema::new().with_option("main_class", string(None, "Entry point class")),
        ),
        builtin(
            "bytebuddy",
            CapabilityKind::Instrumentation,
            "Build-time bytecode instrumentation",
            ConfigSchema::new()
                .with_option("adjustment", string(Some("active"), "Plugin adjustment mode"))
                .with_option(
                    "plugins",
                    OptionSpec::new(OptionType::List)
                        .with_default(json!([]))
                        .with_description("Instrumentation plugin classes"),
                )
                .with_option("command", string(None, "Instrumentation command")),
        ),
        builtin(
            "copyright",
            CapabilityKind::SourceCheck,
            "License header check over module sources",
            ConfigSchema::new()
                .with_option(
                    "header",
                    string(Some("Copyright (c)"), "Text every source file must carry near its top"),
                )
                .with_option(
                    "extensions",
                    OptionSpec::new(OptionType::List)
                        .with_default(json!(["java", "kt", "kts", "groovy"]))
                        .with_description("File extensions to check"),
                )
                .with_option("source_dir", string(Some("src"), "Directory to scan, relative to the module"))
                .with_option("command", string(None, "Command replacing the built-in check")),
        ),
        builtin(
            "java",
            CapabilityKind::Compile,
            "Source compilation",
            ConfigSchema::new()
                .with_option("encoding", string(Some("UTF-8"), "Source encoding"))
                .with_option(
                    "source_compatibility",
                    string(Some("17"), "Language level"),
                )
                .with_option("command", string(None, "Build command"))
                .with_option(
                    "artifact",
                    string(None, "Artifact path produced by the build command"),
                ),
        ),
        builtin(
            "publish",
            CapabilityKind::Publish,
            "Artifact publishing",
            ConfigSchema::new()
                .with_option("repository", string(None, "Target repository directory"))
                .with_option(
                    "sign",
                    OptionSpec::new(OptionType::Boolean)
                        .with_default(json!(false))
                        .with_description("Sign published artifacts"),
                ),
        ),
        builtin(
            "test",
            CapabilityKind::Test,
            "Test execution with coverage collection",
            ConfigSchema::new()
                .with_option("command", string(None, "Test command"))
                .with_option(
                    "coverage_report",
                    string(Some("build/coverage.json"), "Coverage report path"),
                ),
        ),
        builtin(
            "verification",
            CapabilityKind::Verification,
            "Coverage thresholds",
            ConfigSchema::new()
                .with_option("instruction_ratio", ratio())
                .with_option("branch_ratio", ratio())
                .with_option("line_ratio", ratio())
                .with_option(
                    "package_exclusions",
                    OptionSpec::new(OptionType::List)
                        .with_default(json!([]))
                        .with_description("Packages ignored by coverage checks"),
                ),
        ),
    ]
}

fn ratio() -> OptionSpec {
    OptionSpec::new(OptionType::Float)
        .with_default(json!(0.0))
        .with_description("Minimum covered ratio")
}

impl CapabilitySet {
    /// A set pre-populated with [`builtin_capabilities`].
    pub fn with_builtins() -> Self {
        let mut set = Self::new();
        for capability in builtin_capabilities() {
            // Builtin names are valid and unique
            if let Err(e) = set.define(capability) {
                tracing::warn!(error = %e, "Skipping builtin capability");
            }
        }
        set
    }
}
