//! # Engine Module
//!
//! The stateful logic core of DockFlow: everything needed to drive a
//! screening campaign from an ordered stage list down to individual
//! work-unit steps.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - typed user settings and the workflow
//!   stage/plugin assignment table
//! - **Plugin Contract** ([`plugin`], [`registry`]) - the boot/run/shutdown
//!   lifecycle and the explicit identifier-to-constructor registry
//! - **Stage Sequencing** ([`sequencer`]) - ordered stage walk with
//!   best-effort plugin isolation
//! - **Task Dispatch** ([`dispatch`]) - inline or pooled fan-out over
//!   independent work units, with a liveness monitor
//! - **Persistence** ([`persist`]) - durable progress snapshots with rotating
//!   backups
//! - **Progress Monitoring** ([`progress`]) - progress events and callbacks
//! - **Error Handling** ([`error`]) - engine-wide error taxonomy

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod persist;
pub mod plugin;
pub mod progress;
pub mod registry;
pub mod sequencer;
