//! High-level, user-facing entry points.
//!
//! A workflow wires the engine together for one complete use case: resolve
//! paths, restore prior progress, run the stage sequencer with the built-in
//! plugin registry, and persist the final state. Callers (the CLI, library
//! embedders) interact with this layer and rarely need anything below it.

pub mod screen;
