//! Built-in plugins.
//!
//! - [`structure_sync`] serves the `sync` stage: it validates the input
//!   directories and registers the structures found there.
//! - [`exec_dock`] serves the `docking` stage: a generic adapter around an
//!   external command-line docking engine, driving every receptor x ligand
//!   complex through its step sequence and ranking the pooled results.

pub mod exec_dock;
pub mod structure_sync;

use crate::core::models::entity::{EntityKind, EntityRecord, EntityRegistry};
use crate::engine::error::EngineError;
use std::fs;
use std::path::Path;
use tracing::warn;

/// File extensions accepted as input structures.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdb", "pdbqt", "sdf", "mol2"];

/// Scans `dir` for structure files and registers them by file stem.
///
/// Unsupported files are logged and skipped, not errors: input directories
/// routinely hold notes and conversion leftovers.
pub fn scan_structures(dir: &Path, kind: EntityKind) -> Result<EntityRegistry, EngineError> {
    let mut registry = EntityRegistry::new();
    if !dir.is_dir() {
        return Ok(registry);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            warn!(path = %path.display(), "Skipping file with unsupported extension.");
            continue;
        }
        if let Some(record) = EntityRecord::from_path(kind, &path) {
            registry.insert(record);
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn scan_registers_supported_files_only() {
        let dir = tempdir().unwrap();
        for name in ["1abc.pdbqt", "2xyz.pdb", "notes.txt", "lig.sdf"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let registry = scan_structures(dir.path(), EntityKind::Receptor).unwrap();
        let uids: Vec<_> = registry.uids().collect();
        assert_eq!(uids, ["1abc", "2xyz", "lig"]);
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let registry =
            scan_structures(Path::new("/definitely/not/here"), EntityKind::Ligand).unwrap();
        assert!(registry.is_empty());
    }
}
