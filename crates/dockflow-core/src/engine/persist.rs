//! Durable progress snapshots with rotating backups.
//!
//! The snapshot is the sole durability mechanism: there is no write-ahead log
//! of individual step transitions, so crash recovery is "as of last save".
//! Callers checkpoint after each queue drain and at plugin shutdown. A save
//! never overwrites the previous snapshot silently: the on-disk file is
//! rotated into the backup directory first, and the new bytes land via
//! write-to-temp-then-rename so a concurrent restore can never observe a
//! partial write.

use crate::core::models::complex::{Complex, ComplexId};
use crate::core::models::entity::EntityRegistry;
use crate::core::steps::StepSequence;
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Bumped when the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-plugin partition of the snapshot.
///
/// Workers only ever mutate their own unit's entry in `complexes`; the map
/// layout is what enforces the no-cross-unit-writes policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginProgress {
    pub complexes: BTreeMap<ComplexId, Complex>,
    pub receptors: EntityRegistry,
    pub ligands: EntityRegistry,
}

impl PluginProgress {
    /// (unit id, position description) per complex, for status listings.
    pub fn status(&self, sequence: &StepSequence) -> Vec<(String, String)> {
        self.complexes
            .iter()
            .map(|(id, c)| (id.to_string(), c.step_state.describe(sequence)))
            .collect()
    }

    pub fn terminal_count(&self, sequence: &StepSequence) -> usize {
        self.complexes
            .values()
            .filter(|c| c.step_state.is_terminal(sequence))
            .count()
    }
}

/// The serializable bundle of all plugins' in-flight state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub version: u32,
    pub plugins: BTreeMap<String, PluginProgress>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            plugins: BTreeMap::new(),
        }
    }
}

impl ProgressSnapshot {
    pub fn plugin_mut(&mut self, uid: &str) -> &mut PluginProgress {
        self.plugins.entry(uid.to_string()).or_default()
    }

    pub fn plugin(&self, uid: &str) -> Option<&PluginProgress> {
        self.plugins.get(uid)
    }
}

const BACKUP_EXTENSION: &str = "bak";

/// Serializes snapshots to a canonical path, rotating prior copies into a
/// backup directory and pruning backups beyond the retention count.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    backup_dir: PathBuf,
    retention: usize,
}

impl ProgressStore {
    pub fn new(path: PathBuf, backup_dir: PathBuf, retention: usize) -> Self {
        Self {
            path,
            backup_dir,
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotates the existing file into the backup directory, then writes the
    /// snapshot atomically (temp file + rename).
    pub fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), EngineError> {
        if self.file_has_content(&self.path) {
            self.rotate_into_backup()?;
        }

        let bytes = bincode::serialize(snapshot).map_err(|e| EngineError::Persistence {
            path: self.path.clone(),
            message: format!("snapshot serialization failed: {e}"),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Progress snapshot saved.");
        self.prune_backups()
    }

    /// Restores the latest snapshot, or `None` when the canonical path is
    /// absent or empty. A present-but-corrupt snapshot is a fatal
    /// persistence error, never silently discarded.
    pub fn restore(&self) -> Result<Option<ProgressSnapshot>, EngineError> {
        if !self.file_has_content(&self.path) {
            debug!(path = %self.path.display(), "No prior progress snapshot found.");
            return Ok(None);
        }

        let bytes = fs::read(&self.path)?;
        let snapshot: ProgressSnapshot =
            bincode::deserialize(&bytes).map_err(|e| EngineError::Persistence {
                path: self.path.clone(),
                message: format!("snapshot deserialization failed: {e}"),
            })?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::Persistence {
                path: self.path.clone(),
                message: format!(
                    "snapshot version {} does not match expected {}",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }

        info!(
            path = %self.path.display(),
            plugins = snapshot.plugins.len(),
            "Progress snapshot restored."
        );
        Ok(Some(snapshot))
    }

    /// Deletes backups beyond the retention count, oldest first.
    pub fn prune_backups(&self) -> Result<(), EngineError> {
        let mut backups = self.list_backups()?;
        if backups.len() <= self.retention {
            return Ok(());
        }
        backups.sort();
        let excess = backups.len() - self.retention;
        for old in backups.into_iter().take(excess) {
            debug!(path = %old.display(), "Pruning old snapshot backup.");
            fs::remove_file(&old)?;
        }
        Ok(())
    }

    /// Removes the backup directory when nothing is left in it.
    pub fn remove_backup_dir_if_empty(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.backup_dir) {
            if entries.next().is_none() {
                if let Err(e) = fs::remove_dir(&self.backup_dir) {
                    warn!(error = %e, "Could not remove empty backup directory.");
                }
            }
        }
    }

    fn rotate_into_backup(&self) -> Result<(), EngineError> {
        fs::create_dir_all(&self.backup_dir)?;
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("progress");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        // Zero-padded second plus nanosecond stamp keeps names sortable
        // oldest-first, and a name is never reused after pruning: a reused
        // low name would sort before older surviving backups and be pruned
        // as if it were the oldest.
        let stamp = format!("{:012}.{:09}", now.as_secs(), now.subsec_nanos());

        let mut counter = 0u32;
        let backup_path = loop {
            let candidate = self
                .backup_dir
                .join(format!("{name}.{stamp}.{counter:03}.{BACKUP_EXTENSION}"));
            if !candidate.exists() {
                break candidate;
            }
            counter += 1;
        };

        fs::copy(&self.path, &backup_path)?;
        debug!(backup = %backup_path.display(), "Rotated previous snapshot into backup.");
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<PathBuf>, EngineError> {
        let prefix = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("progress")
            .to_string();

        let mut backups = Vec::new();
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(backups),
        };
        for entry in entries {
            let path = entry?.path();
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if file_name.starts_with(&prefix)
                && path.extension().and_then(|e| e.to_str()) == Some(BACKUP_EXTENSION)
            {
                backups.push(path);
            }
        }
        Ok(backups)
    }

    fn file_has_content(&self, path: &Path) -> bool {
        fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
    }
}
