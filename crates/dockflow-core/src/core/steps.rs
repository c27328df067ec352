//! Ordered step sequences and the per-work-unit completion state machine.
//!
//! Every plugin processes its work units through a fixed, named sequence of
//! steps. The [`StepState`] attached to each unit records which steps have
//! completed, which makes interrupted runs resumable: after a crash the next
//! pass re-enters the unit at the first incomplete step. Step handlers are
//! expected to be idempotent with respect to their own output artifacts, so
//! re-attempting a step that was interrupted mid-way is always safe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Step '{0}' is not part of the step sequence")]
    UnknownStep(String),

    #[error("Step '{0}' was already marked as completed")]
    AlreadyCompleted(String),

    #[error("Step sequence must not be empty")]
    EmptySequence,

    #[error("Duplicate step name '{0}' in sequence")]
    DuplicateStep(String),
}

/// An immutable, ordered sequence of unique step names.
///
/// Defined once per plugin type and shared by all of its work units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSequence {
    names: Vec<String>,
}

impl StepSequence {
    pub fn new<I, S>(names: I) -> Result<Self, StepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(StepError::EmptySequence);
        }
        let mut seen = BTreeSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(StepError::DuplicateStep(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, step: &str) -> bool {
        self.names.iter().any(|n| n == step)
    }
}

/// Per-work-unit cursor over a [`StepSequence`].
///
/// Only the completed set is stored; the cursor is derived as the position of
/// the first step not yet in that set. A step never re-enters the completed
/// set once present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    completed: BTreeSet<String>,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next incomplete step, or `None` when the unit is terminal.
    pub fn advance<'s>(&self, sequence: &'s StepSequence) -> Option<&'s str> {
        sequence
            .names()
            .iter()
            .find(|name| !self.completed.contains(name.as_str()))
            .map(String::as_str)
    }

    /// Records `step` as completed.
    ///
    /// Marking an unknown step or a step that is already completed is a
    /// caller bug and fails loudly rather than being silently ignored. The
    /// completed set is unchanged after a failed call.
    pub fn mark_done(&mut self, sequence: &StepSequence, step: &str) -> Result<(), StepError> {
        if !sequence.contains(step) {
            return Err(StepError::UnknownStep(step.to_string()));
        }
        if self.completed.contains(step) {
            return Err(StepError::AlreadyCompleted(step.to_string()));
        }
        self.completed.insert(step.to_string());
        Ok(())
    }

    pub fn is_terminal(&self, sequence: &StepSequence) -> bool {
        sequence
            .names()
            .iter()
            .all(|name| self.completed.contains(name.as_str()))
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Human-readable position, e.g. for status listings.
    pub fn describe(&self, sequence: &StepSequence) -> String {
        match self.advance(sequence) {
            Some(step) => format!("{}/{} (next: {})", self.completed.len(), sequence.len(), step),
            None => format!("{0}/{0} (done)", sequence.len()),
        }
    }
}
