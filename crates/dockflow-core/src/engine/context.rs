//! Shared pipeline context.
//!
//! Replaces the original global mutable settings object with an explicit
//! context handed to each plugin call: read-only user settings and resolved
//! paths, the mutable progress snapshot (partitioned per plugin uid), the
//! progress store, the shared task board, and the progress reporter.

use crate::engine::config::{ResolvedPaths, UserSettings};
use crate::engine::dispatch::TaskBoard;
use crate::engine::error::EngineError;
use crate::engine::persist::{PluginProgress, ProgressSnapshot, ProgressStore};
use crate::engine::progress::ProgressReporter;
use std::sync::Arc;

pub struct PipelineContext {
    pub settings: UserSettings,
    pub paths: ResolvedPaths,
    pub snapshot: ProgressSnapshot,
    pub store: ProgressStore,
    pub board: TaskBoard,
    pub reporter: Arc<ProgressReporter>,
}

impl PipelineContext {
    /// The calling plugin's mutable scratch partition.
    pub fn plugin_progress_mut(&mut self, uid: &str) -> &mut PluginProgress {
        self.snapshot.plugin_mut(uid)
    }

    pub fn plugin_progress(&self, uid: &str) -> Option<&PluginProgress> {
        self.snapshot.plugin(uid)
    }

    /// Durably persists the current snapshot.
    pub fn checkpoint(&self) -> Result<(), EngineError> {
        self.store.save(&self.snapshot)
    }
}
