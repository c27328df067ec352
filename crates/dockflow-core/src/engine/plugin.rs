//! The plugin contract.
//!
//! A plugin is a polymorphic unit of work bound to one or more workflow
//! stages. The sequencer constructs it per stage occurrence and calls
//! `boot`, `run`, `shutdown` strictly in that order; each call is free to be
//! a no-op and must be safe to re-run after an interrupted campaign (all
//! durable effects go through the progress snapshot and idempotent step
//! handlers).

use crate::engine::context::PipelineContext;
use crate::engine::error::EngineError;
use std::path::PathBuf;

/// Static identity of a plugin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginIdentity {
    pub name: &'static str,
    pub uid: &'static str,
    pub version: &'static str,
    /// Stages this plugin type can serve. The sequencer dispatches by this
    /// declaration rather than by any type hierarchy.
    pub assignments: &'static [&'static str],
}

/// Construction arguments shared by every plugin.
#[derive(Debug, Clone)]
pub struct PluginInit {
    pub path_base: PathBuf,
    pub current_stage: String,
}

pub trait Plugin: Send {
    fn identity(&self) -> &PluginIdentity;

    fn boot(&mut self, _ctx: &mut PipelineContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn run(&mut self, _ctx: &mut PipelineContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &mut PipelineContext) -> Result<(), EngineError> {
        Ok(())
    }
}
