//! Work units: one receptor x ligand combination ("complex").

use crate::core::ranking::ScoreTable;
use crate::core::steps::StepState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Deterministic identifier for a receptor x ligand pairing.
///
/// The slug is order-sensitive: `rec--lig`, with each side lowercased and
/// non-alphanumeric runs collapsed to single hyphens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComplexId(String);

impl ComplexId {
    pub const SEPARATOR: &'static str = "--";

    pub fn new(receptor_uid: &str, ligand_uid: &str) -> Self {
        Self(format!(
            "{}{}{}",
            slugify(receptor_uid),
            Self::SEPARATOR,
            slugify(ligand_uid)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComplexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut last_was_hyphen = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen && !slug.is_empty() {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// One work unit processed end-to-end through a plugin's step sequence.
///
/// Created the first time its pairing is encountered during stage fan-out,
/// mutated by successive step handlers, and never deleted by the core.
/// Artifacts (per-pose score tables and the like) attach as steps complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub uid: ComplexId,
    pub receptor_uid: String,
    pub ligand_uid: String,
    pub workdir: PathBuf,
    pub path_receptor: PathBuf,
    pub path_ligand: PathBuf,
    pub path_engine_config: PathBuf,
    pub path_poses_out: PathBuf,
    pub path_score_log: PathBuf,
    pub step_state: StepState,
    pub artifacts: BTreeMap<String, ScoreTable>,
}

impl Complex {
    pub fn new(receptor_uid: &str, ligand_uid: &str, workdir: PathBuf) -> Self {
        let uid = ComplexId::new(receptor_uid, ligand_uid);
        let path_receptor = workdir.join("REC.pdbqt");
        let path_ligand = workdir.join("LIG.pdbqt");
        let path_engine_config = workdir.join(format!("{uid}.engine.config"));
        let path_poses_out = workdir.join(format!("{uid}.out.pdbqt"));
        let path_score_log = workdir.join(format!("{uid}.score.txt"));
        Self {
            uid,
            receptor_uid: receptor_uid.to_string(),
            ligand_uid: ligand_uid.to_string(),
            workdir,
            path_receptor,
            path_ligand,
            path_engine_config,
            path_poses_out,
            path_score_log,
            step_state: StepState::new(),
            artifacts: BTreeMap::new(),
        }
    }

    pub fn attach_artifact(&mut self, name: impl Into<String>, table: ScoreTable) {
        self.artifacts.insert(name.into(), table);
    }

    pub fn artifact(&self, name: &str) -> Option<&ScoreTable> {
        self.artifacts.get(name)
    }
}
