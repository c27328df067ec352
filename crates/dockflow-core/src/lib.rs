//! # DockFlow Core Library
//!
//! A resumable, multi-stage virtual-screening pipeline orchestrator. DockFlow
//! walks an ordered list of workflow stages, delegates each stage to the
//! plugins assigned to it, processes every receptor x ligand combination
//! through a per-plugin step sequence, persists all in-flight state so a run
//! survives interruption, and merges several scoring columns into a single
//! composite rank per ligand.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Stateless data models (entities, complexes,
//!   step sequences, score tables), the pure composite-ranking algorithm, and
//!   tabular I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates pipeline
//!   execution. It includes the plugin contract and registry, the stage
//!   sequencer, the task dispatcher with its liveness monitor, and the durable
//!   progress store.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   It ties the `engine` and `core` together to execute a complete screening
//!   campaign from a workflow configuration.
//!
//! Built-in plugins (input synchronization, a generic external docking engine
//! adapter) live in [`plugins`] and exercise the engine end to end.

pub mod core;
pub mod engine;
pub mod plugins;
pub mod workflows;
