//! Input entities (receptors and ligands) and their registries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which side of a receptor x ligand pairing an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Receptor,
    Ligand,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Receptor => "receptor",
            EntityKind::Ligand => "ligand",
        }
    }
}

/// One input structure file, identified by its stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub uid: String,
    pub kind: EntityKind,
    pub source_path: PathBuf,
}

impl EntityRecord {
    pub fn from_path(kind: EntityKind, path: &Path) -> Option<Self> {
        let uid = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            uid,
            kind,
            source_path: path.to_path_buf(),
        })
    }
}

/// Uid-keyed registry for one side of the pairing.
///
/// A `BTreeMap` keeps enumeration order deterministic, which in turn keeps
/// complex creation order and report ordering stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRegistry {
    records: BTreeMap<String, EntityRecord>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: EntityRecord) {
        self.records.insert(record.uid.clone(), record);
    }

    pub fn get(&self, uid: &str) -> Option<&EntityRecord> {
        self.records.get(uid)
    }

    pub fn uids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uid_is_the_file_stem() {
        let record =
            EntityRecord::from_path(EntityKind::Receptor, Path::new("/data/receptors/1abc.pdbqt"))
                .unwrap();
        assert_eq!(record.uid, "1abc");
        assert_eq!(record.kind, EntityKind::Receptor);
    }

    #[test]
    fn registry_enumerates_in_sorted_uid_order() {
        let mut registry = EntityRegistry::new();
        for name in ["zeta.pdbqt", "alpha.pdbqt", "mid.pdbqt"] {
            registry.insert(
                EntityRecord::from_path(EntityKind::Ligand, Path::new(name)).unwrap(),
            );
        }
        let uids: Vec<_> = registry.uids().collect();
        assert_eq!(uids, ["alpha", "mid", "zeta"]);
    }
}
