//! Per-unit configuration.
//!
//! There is no process-wide state: every unit is bound with its own
//! [`UnitSettings`], threaded through the binder's context.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Module file format version: a byte pair compared exactly on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u8,
    pub minor: u8,
}

impl ModuleVersion {
    /// The version this build reads and writes.
    pub const CURRENT: ModuleVersion = ModuleVersion::new(1, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for ModuleVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Settings for binding one compile unit.
///
/// # Example
///
/// ```
/// use sable_core::UnitSettings;
///
/// let settings = UnitSettings::new("app")
///     .with_export_internal(true)
///     .with_max_template_depth(32);
/// assert_eq!(settings.unit_name, "app");
/// assert!(settings.defer_virtual_instantiation);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSettings {
    /// Name written into module files.
    pub unit_name: String,
    /// Index of the first source file of this unit.
    pub file_index_base: u32,
    /// Module format version this unit writes and accepts.
    pub module_version: ModuleVersion,
    /// Bind virtual member bodies of class template instances only once a
    /// complete virtual table is required.
    pub defer_virtual_instantiation: bool,
    /// Export `internal` symbols as well as `public` ones.
    pub export_internal: bool,
    /// Maximum nesting of template instantiations.
    pub max_template_depth: usize,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            unit_name: String::from("main"),
            file_index_base: 0,
            module_version: ModuleVersion::CURRENT,
            defer_virtual_instantiation: true,
            export_internal: false,
            max_template_depth: 64,
        }
    }
}

impl UnitSettings {
    /// Default settings for a unit named `unit_name`.
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self {
            unit_name: unit_name.into(),
            ..Self::default()
        }
    }

    pub fn with_file_index_base(mut self, base: u32) -> Self {
        self.file_index_base = base;
        self
    }

    pub fn with_module_version(mut self, version: ModuleVersion) -> Self {
        self.module_version = version;
        self
    }

    pub fn with_defer_virtual_instantiation(mut self, defer: bool) -> Self {
        self.defer_virtual_instantiation = defer;
        self
    }

    pub fn with_export_internal(mut self, export: bool) -> Self {
        self.export_internal = export;
        self
    }

    pub fn with_max_template_depth(mut self, depth: usize) -> Self {
        self.max_template_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = UnitSettings::default();
        assert_eq!(settings.module_version, ModuleVersion::CURRENT);
        assert!(!settings.export_internal);
        assert_eq!(settings.max_template_depth, 64);
    }

    #[test]
    fn builder_chain() {
        let settings = UnitSettings::new("lib")
            .with_file_index_base(3)
            .with_defer_virtual_instantiation(false)
            .with_module_version(ModuleVersion::new(1, 1));
        assert_eq!(settings.file_index_base, 3);
        assert!(!settings.defer_virtual_instantiation);
        assert_eq!(settings.module_version.to_string(), "1.1");
    }
}
