//! Shell instrumenter
//!
//! Runs `<capability>.command` once the module is configured. The binding
//! options are passed as JSON in `GANTRY_CAPABILITY_OPTIONS`. Source checks
//! without a command fall back to the built-in license header scan; other
//! capabilities without a command are accepted silently.

use async_trait::async_trait;
use gantry_capability::{Binding, CapabilityKind};
use gantry_core::{CollaboratorResult, Instrumenter, ModuleContext};

use crate::error::Result;
use crate::headers::check_headers;
use crate::shell::run_checked;

#[derive(Debug, Clone, Default)]
pub struct ShellInstrumenter;

impl ShellInstrumenter {
    pub fn new() -> Self {
        Self
    }

    async fn apply(&self, ctx: &ModuleContext, binding: &Binding) -> Result<()> {
        let key = binding.capability.option_key("command");
        let Some(command) = ctx.config.get_str(&key) else {
            if binding.kind() == CapabilityKind::SourceCheck {
                return check_headers(ctx, binding.name()).await;
            }
            tracing::debug!(module = %ctx.module, capability = binding.name(), "No instrumentation command");
            return Ok(());
        };
        let options = serde_json::to_string(&binding.options).unwrap_or_default();
        run_checked(command, ctx, &[("GANTRY_CAPABILITY_OPTIONS", options)]).await?;
        Ok(())
    }
}

#[async_trait]
impl Instrumenter for ShellInstrumenter {
    async fn instrument(&self, ctx: &ModuleContext, binding: &Binding) -> CollaboratorResult<()> {
        Ok(self.apply(ctx, binding).await?)
    }
}
