//! Data models for screening inputs and work units.

pub mod complex;
pub mod entity;
