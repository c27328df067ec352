//! Foundation layer: stateless data models and pure algorithms.
//!
//! Nothing in this module performs pipeline orchestration or touches durable
//! state. The types here are the vocabulary the [`crate::engine`] layer
//! operates on: step sequences and their per-unit completion state, entity
//! registries, work-unit ("complex") records, and score tables with the
//! composite ranking algorithm.

pub mod io;
pub mod models;
pub mod ranking;
pub mod steps;
