//! The stage sequencer ("master" process).
//!
//! Walks the ordered stage list and, per stage, boots/runs/shuts down every
//! plugin assigned to it, strictly in order and never interleaved. Plugins
//! within a stage do not run concurrently with each other; parallelism lives
//! inside a plugin's own unit processing.

use crate::engine::config::WorkflowConfig;
use crate::engine::context::PipelineContext;
use crate::engine::error::EngineError;
use crate::engine::plugin::PluginInit;
use crate::engine::progress::Progress;
use crate::engine::registry::PluginRegistry;
use tracing::{debug, info, instrument, warn};

pub struct Master<'a> {
    registry: &'a PluginRegistry,
}

impl<'a> Master<'a> {
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    /// Runs the whole workflow.
    ///
    /// Every stage assignment is validated against the registry before any
    /// stage runs; an unresolvable identifier is fatal up front. Lifecycle
    /// failures of individual plugins are logged and do not prevent the
    /// remaining plugins or stages from running (best-effort pipeline).
    #[instrument(skip_all, name = "master_process")]
    pub fn process(
        &self,
        workflow: &WorkflowConfig,
        ctx: &mut PipelineContext,
    ) -> Result<(), EngineError> {
        info!("Master process started.");
        self.validate(workflow)?;

        for stage in &workflow.order {
            let assigned = workflow.assigned(stage);
            if assigned.is_empty() {
                debug!(stage, "No plugins assigned; stage skipped.");
                continue;
            }

            info!(stage, plugins = assigned.len(), "Entering workflow stage.");
            ctx.reporter.report(Progress::StageStart {
                name: stage.clone(),
            });

            for uid in assigned {
                // Already validated; a miss here would be a registry mutation
                // mid-run, which the borrow rules preclude.
                let Some(constructor) = self.registry.resolve(uid) else {
                    continue;
                };
                let mut plugin = constructor(PluginInit {
                    path_base: ctx.paths.base.clone(),
                    current_stage: stage.clone(),
                });

                let identity = plugin.identity().clone();
                if !identity.assignments.contains(&stage.as_str()) {
                    warn!(
                        stage,
                        plugin = identity.uid,
                        declared = ?identity.assignments,
                        "Plugin does not declare this stage; running it anyway."
                    );
                }

                info!(stage, plugin = identity.uid, "Delegating task to plugin.");
                ctx.reporter.report(Progress::PluginStart {
                    stage: stage.clone(),
                    uid: identity.uid.to_string(),
                });

                let outcome = (|| -> Result<(), EngineError> {
                    plugin.boot(ctx)?;
                    plugin.run(ctx)?;
                    plugin.shutdown(ctx)
                })();
                if let Err(e) = outcome {
                    warn!(
                        stage,
                        plugin = identity.uid,
                        error = %e,
                        "Plugin lifecycle failed; continuing with next plugin."
                    );
                }

                ctx.reporter.report(Progress::PluginFinish {
                    uid: identity.uid.to_string(),
                });
            }

            ctx.reporter.report(Progress::StageFinish);
        }

        info!("Master process finished.");
        Ok(())
    }

    fn validate(&self, workflow: &WorkflowConfig) -> Result<(), EngineError> {
        for stage in &workflow.order {
            for uid in workflow.assigned(stage) {
                if self.registry.resolve(uid).is_none() {
                    return Err(EngineError::Configuration(format!(
                        "stage '{stage}' references unknown plugin '{uid}'"
                    )));
                }
            }
        }
        Ok(())
    }
}
