//! Input synchronization plugin (`sync` stage).
//!
//! Makes sure the receptor and ligand directories exist, registers every
//! structure found in them, and records the registries in its snapshot
//! partition so later stages and status listings can see what the campaign
//! starts from. Remote fetching of structures by database identifier is an
//! external collaborator concern and deliberately absent here.

use crate::core::models::entity::EntityKind;
use crate::engine::context::PipelineContext;
use crate::engine::error::EngineError;
use crate::engine::plugin::{Plugin, PluginIdentity, PluginInit};
use crate::plugins::scan_structures;
use std::fs;
use tracing::{debug, info, warn};

pub struct StructureSync {
    init: PluginInit,
}

impl StructureSync {
    pub const IDENTITY: PluginIdentity = PluginIdentity {
        name: "Structure Sync",
        uid: "structuresync",
        version: "1.0",
        assignments: &["sync"],
    };

    pub fn construct(init: PluginInit) -> Box<dyn Plugin> {
        Box::new(Self { init })
    }
}

impl Plugin for StructureSync {
    fn identity(&self) -> &PluginIdentity {
        &Self::IDENTITY
    }

    fn boot(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        debug!(stage = %self.init.current_stage, "StructureSync booting.");
        fs::create_dir_all(&ctx.paths.receptors)?;
        fs::create_dir_all(&ctx.paths.ligands)?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        let receptors = scan_structures(&ctx.paths.receptors, EntityKind::Receptor)?;
        let ligands = scan_structures(&ctx.paths.ligands, EntityKind::Ligand)?;

        if receptors.is_empty() {
            warn!(dir = %ctx.paths.receptors.display(), "No receptor structures found.");
        }
        if ligands.is_empty() {
            warn!(dir = %ctx.paths.ligands.display(), "No ligand structures found.");
        }
        info!(
            receptors = receptors.len(),
            ligands = ligands.len(),
            "Input structures synchronized."
        );

        let progress = ctx.plugin_progress_mut(Self::IDENTITY.uid);
        progress.receptors = receptors;
        progress.ligands = ligands;
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        ctx.checkpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PipelineConfig, ResolvedPaths};
    use crate::engine::dispatch::TaskBoard;
    use crate::engine::persist::{ProgressSnapshot, ProgressStore};
    use crate::engine::progress::ProgressReporter;
    use std::fs::File;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn context_in(dir: &std::path::Path) -> PipelineContext {
        let config = PipelineConfig::default();
        let paths = ResolvedPaths::resolve(dir, &config.user);
        let store = ProgressStore::new(
            paths.progress_file.clone(),
            paths.backup_dir.clone(),
            config.user.backup_retention,
        );
        PipelineContext {
            settings: config.user,
            paths,
            snapshot: ProgressSnapshot::default(),
            store,
            board: TaskBoard::new(),
            reporter: Arc::new(ProgressReporter::new()),
        }
    }

    #[test]
    fn boot_creates_input_directories_and_run_registers_structures() {
        let dir = tempdir().unwrap();
        let mut ctx = context_in(dir.path());
        let mut plugin = StructureSync {
            init: PluginInit {
                path_base: dir.path().to_path_buf(),
                current_stage: "sync".to_string(),
            },
        };

        plugin.boot(&mut ctx).unwrap();
        assert!(ctx.paths.receptors.is_dir());
        assert!(ctx.paths.ligands.is_dir());

        File::create(ctx.paths.receptors.join("1abc.pdbqt")).unwrap();
        File::create(ctx.paths.ligands.join("zinc42.pdbqt")).unwrap();

        plugin.run(&mut ctx).unwrap();
        plugin.shutdown(&mut ctx).unwrap();

        let progress = ctx.plugin_progress(StructureSync::IDENTITY.uid).unwrap();
        assert_eq!(progress.receptors.len(), 1);
        assert_eq!(progress.ligands.len(), 1);
        assert!(ctx.store.path().exists());
    }
}
