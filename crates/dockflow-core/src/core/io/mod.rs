//! Tabular I/O utilities.

pub mod table;
