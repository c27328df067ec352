use crate::core::steps::StepError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unresolvable plugin identifier or malformed stage assignment. Fatal:
    /// aborts the whole `process()` call before any stage runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A step was marked done twice or an unknown step was requested.
    /// Programming error, fatal for the plugin instance that raised it.
    #[error("Step protocol violation: {source}")]
    StepProtocol {
        #[from]
        source: StepError,
    },

    /// A step handler failed during its work. The step is not marked done,
    /// so the unit resumes at the same step on the next pass.
    #[error("Step '{step}' failed for complex '{complex}': {message}")]
    StepExecution {
        complex: String,
        step: String,
        message: String,
    },

    /// Snapshot read/write failure. A corrupt-but-present snapshot is fatal;
    /// only absent/empty files are treated as "no prior run".
    #[error("Persistence failure at '{path}': {message}", path = path.display())]
    Persistence { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
