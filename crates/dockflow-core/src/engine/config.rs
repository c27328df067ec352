//! Typed pipeline configuration.
//!
//! The original attribute-bag settings object is replaced by explicit structs
//! with serde defaults: [`UserSettings`] for run-wide knobs, [`EngineSettings`]
//! for the external docking engine adapter, and [`WorkflowConfig`] for the
//! ordered stage list with per-stage plugin assignments. The whole bundle
//! round-trips through a TOML workflow file; when none exists a default is
//! generated for the user to review.

use crate::core::ranking::{RankSpec, SortOrder};
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_WORKFLOW_FILE: &str = "dockflow.workflow.toml";
pub const DEFAULT_PROGRESS_FILE: &str = "dockflow.progress.bin";
pub const BACKUP_DIR_NAME: &str = "temp-progress-backup";

/// External docking engine adapter settings.
///
/// The engine is a generic command-line collaborator: `executable` plus an
/// argv template in which `{receptor}`, `{ligand}`, `{config}`, and `{out}`
/// are substituted per complex. `config_params` is written verbatim into the
/// per-complex engine config file (grid geometry, seeds, and other
/// engine-specific keys belong there).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub executable: String,
    pub args: Vec<String>,
    pub config_params: BTreeMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let mut config_params = BTreeMap::new();
        config_params.insert("exhaustiveness".to_string(), "16".to_string());
        config_params.insert("num_modes".to_string(), "10".to_string());
        config_params.insert("energy_range".to_string(), "3".to_string());
        Self {
            executable: "vina".to_string(),
            args: vec![
                "--receptor".to_string(),
                "{receptor}".to_string(),
                "--ligand".to_string(),
                "{ligand}".to_string(),
                "--config".to_string(),
                "{config}".to_string(),
                "--out".to_string(),
                "{out}".to_string(),
            ],
            config_params,
        }
    }
}

/// One ranked column in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankColumn {
    pub column: String,
    /// `true` favors lower values (rank 1 is the smallest).
    pub ascending: bool,
}

/// Run-wide user settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub dir_receptors: String,
    pub dir_ligands: String,
    pub dir_docking: String,
    pub dir_analysis: String,
    pub dir_results: String,
    pub file_progress: String,

    pub multiprocessing: bool,

    pub report_flag: bool,
    pub report_interval_secs: u64,
    pub backup_retention: usize,

    pub engine: EngineSettings,

    /// Columns merged by the composite ranker, in order.
    pub ranking: Vec<RankColumn>,
    /// Column grouping the second-level (top-per-group) selection.
    pub ranking_group_key: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            dir_receptors: "receptors".to_string(),
            dir_ligands: "ligands".to_string(),
            dir_docking: "docking".to_string(),
            dir_analysis: "analysis".to_string(),
            dir_results: "results".to_string(),
            file_progress: DEFAULT_PROGRESS_FILE.to_string(),
            multiprocessing: false,
            report_flag: true,
            report_interval_secs: 90,
            backup_retention: 10,
            engine: EngineSettings::default(),
            ranking: vec![RankColumn {
                column: "affinity".to_string(),
                ascending: true,
            }],
            ranking_group_key: "lig_uid".to_string(),
        }
    }
}

impl UserSettings {
    pub fn rank_spec(&self) -> RankSpec {
        self.ranking.iter().fold(RankSpec::new(), |spec, rc| {
            let order = if rc.ascending {
                SortOrder::Ascending
            } else {
                SortOrder::Descending
            };
            spec.with(rc.column.clone(), order)
        })
    }
}

/// Ordered stage list plus per-stage plugin assignments.
///
/// A stage with no assignment (or an empty list) is skipped. Assignments are
/// plugin identifiers resolved against the registry, case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub order: Vec<String>,
    pub stages: BTreeMap<String, Vec<String>>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let mut stages = BTreeMap::new();
        stages.insert("sync".to_string(), vec!["structuresync".to_string()]);
        stages.insert("docking".to_string(), vec!["execdock".to_string()]);
        stages.insert("analysis".to_string(), Vec::new());
        stages.insert("results".to_string(), Vec::new());
        Self {
            order: vec![
                "sync".to_string(),
                "docking".to_string(),
                "analysis".to_string(),
                "results".to_string(),
            ],
            stages,
        }
    }
}

impl WorkflowConfig {
    pub fn assigned(&self, stage: &str) -> &[String] {
        self.stages.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The full configuration bundle as stored in the workflow TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub user: UserSettings,
    pub workflow: WorkflowConfig,
}

/// Outcome of [`PipelineConfig::load_or_init`].
#[derive(Debug)]
pub enum ConfigSource {
    /// Loaded from an existing workflow file.
    Loaded(PipelineConfig),
    /// No workflow file existed; a default was generated at the given path
    /// and the caller should ask the user to review it before rerunning.
    Generated(PathBuf),
}

impl PipelineConfig {
    /// Loads the workflow file at `path`, or generates a default one.
    ///
    /// An absent or empty file is not an error: the default configuration is
    /// written out so the user can review and rerun. A present-but-malformed
    /// file is a fatal configuration error.
    pub fn load_or_init(path: &Path) -> Result<ConfigSource, EngineError> {
        let exists = path.exists() && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        if !exists {
            let rendered = toml::to_string_pretty(&PipelineConfig::default()).map_err(|e| {
                EngineError::Configuration(format!("failed to render default config: {e}"))
            })?;
            fs::write(path, rendered)?;
            info!(path = %path.display(), "No workflow configuration found; default generated.");
            return Ok(ConfigSource::Generated(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&raw).map_err(|e| {
            EngineError::Configuration(format!(
                "malformed workflow file '{}': {e}",
                path.display()
            ))
        })?;
        Ok(ConfigSource::Loaded(config))
    }
}

/// Absolute paths derived from the base directory and the user settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub base: PathBuf,
    pub receptors: PathBuf,
    pub ligands: PathBuf,
    pub docking: PathBuf,
    pub analysis: PathBuf,
    pub results: PathBuf,
    pub progress_file: PathBuf,
    pub backup_dir: PathBuf,
}

impl ResolvedPaths {
    pub fn resolve(base: &Path, settings: &UserSettings) -> Self {
        Self {
            base: base.to_path_buf(),
            receptors: base.join(&settings.dir_receptors),
            ligands: base.join(&settings.dir_ligands),
            docking: base.join(&settings.dir_docking),
            analysis: base.join(&settings.dir_analysis),
            results: base.join(&settings.dir_results),
            progress_file: base.join(&settings.file_progress),
            backup_dir: base.join(BACKUP_DIR_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_workflow_orders_four_stages() {
        let wf = WorkflowConfig::default();
        assert_eq!(wf.order, ["sync", "docking", "analysis", "results"]);
        assert_eq!(wf.assigned("docking"), ["execdock"]);
        assert!(wf.assigned("results").is_empty());
        assert!(wf.assigned("unknown-stage").is_empty());
    }

    #[test]
    fn missing_file_generates_default_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_WORKFLOW_FILE);

        match PipelineConfig::load_or_init(&path).unwrap() {
            ConfigSource::Generated(p) => assert_eq!(p, path),
            ConfigSource::Loaded(_) => panic!("expected generation on first call"),
        }

        match PipelineConfig::load_or_init(&path).unwrap() {
            ConfigSource::Loaded(config) => assert_eq!(config, PipelineConfig::default()),
            ConfigSource::Generated(_) => panic!("expected load on second call"),
        }
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_WORKFLOW_FILE);
        fs::write(&path, "this is { not toml").unwrap();

        assert!(matches!(
            PipelineConfig::load_or_init(&path),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn rank_spec_translates_directions() {
        let mut settings = UserSettings::default();
        settings.ranking.push(RankColumn {
            column: "total_contacts".to_string(),
            ascending: false,
        });
        let spec = settings.rank_spec();
        assert_eq!(spec.columns().len(), 2);
        assert_eq!(spec.columns()[0].1, SortOrder::Ascending);
        assert_eq!(spec.columns()[1].1, SortOrder::Descending);
    }

    #[test]
    fn resolved_paths_join_the_base_directory() {
        let settings = UserSettings::default();
        let paths = ResolvedPaths::resolve(Path::new("/campaign"), &settings);
        assert_eq!(paths.receptors, PathBuf::from("/campaign/receptors"));
        assert_eq!(
            paths.progress_file,
            PathBuf::from("/campaign/dockflow.progress.bin")
        );
        assert_eq!(
            paths.backup_dir,
            PathBuf::from("/campaign/temp-progress-backup")
        );
    }
}
