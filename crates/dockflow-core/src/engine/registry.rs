//! Explicit plugin registry.
//!
//! The original system discovered plugins by scanning a directory for class
//! definitions; here the registry is a startup-time mapping from identifier
//! to constructor. Lookup is case-insensitive and accepts either the uid or
//! the declared display name.

use crate::engine::plugin::{Plugin, PluginInit};
use crate::plugins::exec_dock::ExecDock;
use crate::plugins::structure_sync::StructureSync;
use std::collections::BTreeMap;

pub type PluginConstructor = fn(PluginInit) -> Box<dyn Plugin>;

#[derive(Default)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, PluginConstructor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in plugins.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            StructureSync::IDENTITY.uid,
            StructureSync::IDENTITY.name,
            StructureSync::construct,
        );
        registry.register(
            ExecDock::IDENTITY.uid,
            ExecDock::IDENTITY.name,
            ExecDock::construct,
        );
        registry
    }

    /// Registers a constructor under both the uid and the display name.
    pub fn register(&mut self, uid: &str, name: &str, constructor: PluginConstructor) {
        self.constructors.insert(uid.to_lowercase(), constructor);
        self.constructors.insert(name.to_lowercase(), constructor);
    }

    pub fn resolve(&self, identifier: &str) -> Option<PluginConstructor> {
        self.constructors.get(&identifier.to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_identifiers_resolve_case_insensitively() {
        let registry = PluginRegistry::builtin();
        assert!(registry.resolve("execdock").is_some());
        assert!(registry.resolve("ExecDock").is_some());
        assert!(registry.resolve("STRUCTURESYNC").is_some());
        // Display names resolve too.
        assert!(registry.resolve("external docking engine").is_some());
    }

    #[test]
    fn unknown_identifier_is_none() {
        let registry = PluginRegistry::builtin();
        assert!(registry.resolve("does-not-exist").is_none());
    }
}
