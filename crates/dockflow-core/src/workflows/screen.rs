//! The virtual-screening campaign workflow.
//!
//! One call runs (or resumes) a whole campaign in a base directory: prior
//! progress is restored from the snapshot if one exists, the stage sequencer
//! walks the configured workflow, and the final state is checkpointed before
//! returning a summary. Interrupting a run and calling [`run`] again
//! continues from the last checkpoint.

use crate::engine::config::{PipelineConfig, ResolvedPaths, UserSettings};
use crate::engine::context::PipelineContext;
use crate::engine::dispatch::{Monitor, TaskBoard};
use crate::engine::error::EngineError;
use crate::engine::persist::{ProgressSnapshot, ProgressStore};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::registry::PluginRegistry;
use crate::engine::sequencer::Master;
use crate::plugins::exec_dock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Summary of one screening pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenOutput {
    pub receptors: usize,
    pub ligands: usize,
    pub complexes_total: usize,
    pub complexes_terminal: usize,
}

/// Per-plugin listing of every complex and its step position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub plugins: Vec<(String, Vec<(String, String)>)>,
}

/// Runs (or resumes) a screening campaign rooted at `base`.
#[instrument(skip_all, name = "screen_campaign")]
pub fn run(
    base: &Path,
    config: &PipelineConfig,
    reporter: ProgressReporter,
) -> Result<ScreenOutput, EngineError> {
    let paths = ResolvedPaths::resolve(base, &config.user);
    let store = ProgressStore::new(
        paths.progress_file.clone(),
        paths.backup_dir.clone(),
        config.user.backup_retention,
    );
    let snapshot = store.restore()?.unwrap_or_default();
    let resumed = !snapshot.plugins.is_empty();
    if resumed {
        info!("Resuming campaign from a prior snapshot.");
    }

    let board = TaskBoard::new();
    let reporter = Arc::new(reporter);
    let monitor = if config.user.report_flag {
        let idle_reporter = reporter.clone();
        Some(Monitor::start(
            board.clone(),
            Duration::from_secs(config.user.report_interval_secs),
            reporter.clone(),
            move || {
                idle_reporter.report(Progress::Message(
                    "All queued tasks completed.".to_string(),
                ));
            },
        ))
    } else {
        None
    };

    let mut ctx = PipelineContext {
        settings: config.user.clone(),
        paths,
        snapshot,
        store,
        board,
        reporter,
    };

    let registry = PluginRegistry::builtin();
    let result = Master::new(&registry).process(&config.workflow, &mut ctx);
    if let Some(monitor) = monitor {
        monitor.stop();
    }
    result?;

    ctx.checkpoint()?;
    ctx.store.prune_backups()?;
    ctx.store.remove_backup_dir_if_empty();

    let output = summarize(&ctx.snapshot);
    info!(
        complexes = output.complexes_total,
        terminal = output.complexes_terminal,
        "Screening campaign finished."
    );
    Ok(output)
}

/// Reads the snapshot under `base` without running anything.
///
/// Returns `None` when no campaign has run there yet.
pub fn status(base: &Path, settings: &UserSettings) -> Result<Option<StatusReport>, EngineError> {
    let paths = ResolvedPaths::resolve(base, settings);
    let store = ProgressStore::new(
        paths.progress_file,
        paths.backup_dir,
        settings.backup_retention,
    );
    let Some(snapshot) = store.restore()? else {
        return Ok(None);
    };

    let sequence = exec_dock::step_sequence();
    let plugins = snapshot
        .plugins
        .iter()
        .map(|(uid, progress)| (uid.clone(), progress.status(&sequence)))
        .collect();
    Ok(Some(StatusReport { plugins }))
}

fn summarize(snapshot: &ProgressSnapshot) -> ScreenOutput {
    let sequence = exec_dock::step_sequence();
    let mut output = ScreenOutput {
        receptors: 0,
        ligands: 0,
        complexes_total: 0,
        complexes_terminal: 0,
    };
    for progress in snapshot.plugins.values() {
        output.receptors = output.receptors.max(progress.receptors.len());
        output.ligands = output.ligands.max(progress.ligands.len());
        output.complexes_total += progress.complexes.len();
        output.complexes_terminal += progress.terminal_count(&sequence);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn seed_inputs(base: &Path) {
        let receptors = base.join("receptors");
        let ligands = base.join("ligands");
        fs::create_dir_all(&receptors).unwrap();
        fs::create_dir_all(&ligands).unwrap();
        fs::write(receptors.join("1abc.pdbqt"), "RECEPTOR").unwrap();
        fs::write(ligands.join("zinc42.pdbqt"), "LIGAND").unwrap();
    }

    fn stub_engine_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        // `true` exits 0 without reading its arguments, which drives every
        // step to completion with an empty score log.
        config.user.engine.executable = "true".to_string();
        config.user.report_flag = false;
        config
    }

    #[cfg(unix)]
    #[test]
    fn campaign_runs_to_terminal_state_and_is_idempotent() {
        let dir = tempdir().unwrap();
        seed_inputs(dir.path());
        let config = stub_engine_config();

        let output = run(dir.path(), &config, ProgressReporter::new()).unwrap();
        assert_eq!(output.receptors, 1);
        assert_eq!(output.ligands, 1);
        assert_eq!(output.complexes_total, 1);
        assert_eq!(output.complexes_terminal, 1);
        assert!(dir.path().join("dockflow.progress.bin").exists());

        // A second pass resumes from the snapshot and has nothing to redo.
        let again = run(dir.path(), &config, ProgressReporter::new()).unwrap();
        assert_eq!(again.complexes_terminal, 1);
    }

    #[cfg(unix)]
    #[test]
    fn status_lists_complexes_after_a_run() {
        let dir = tempdir().unwrap();
        seed_inputs(dir.path());
        let config = stub_engine_config();
        run(dir.path(), &config, ProgressReporter::new()).unwrap();

        let report = status(dir.path(), &config.user).unwrap().unwrap();
        let (_, complexes) = report
            .plugins
            .iter()
            .find(|(uid, _)| uid == "execdock")
            .unwrap();
        assert_eq!(complexes.len(), 1);
        assert_eq!(complexes[0].0, "1abc--zinc42");
        assert!(complexes[0].1.contains("done"));
    }

    #[test]
    fn status_without_prior_run_is_none() {
        let dir = tempdir().unwrap();
        let settings = UserSettings::default();
        assert!(status(dir.path(), &settings).unwrap().is_none());
    }

    #[test]
    fn empty_inputs_produce_an_empty_but_valid_campaign() {
        let dir = tempdir().unwrap();
        let config = stub_engine_config();

        let output = run(dir.path(), &config, ProgressReporter::new()).unwrap();
        assert_eq!(output.complexes_total, 0);
        // The snapshot is still written so a later run resumes cleanly.
        assert!(dir.path().join("dockflow.progress.bin").exists());
    }
}
