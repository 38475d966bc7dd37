//! Compile unit API.
//!
//! A [`Unit`] collects the syntax trees of one compile unit, links the
//! module files it depends on, binds everything, and can then export its
//! own module file for the next unit.
//!
//! # Example
//!
//! ```ignore
//! use sable::{Unit, UnitSettings};
//!
//! let mut engine = Unit::new(UnitSettings::new("engine"));
//! engine.add_file(engine_tree)?;
//! engine.bind()?;
//! let module = engine.export()?;
//!
//! let mut game = Unit::new(UnitSettings::new("game").with_file_index_base(100));
//! game.import(&module)?;
//! game.add_file(game_tree)?;
//! game.bind()?;
//! ```

use rustc_hash::FxHashSet;
use tracing::info;

use sable_compiler::{BindContext, BindSummary, BoundFunction, bind_unit};
use sable_core::{Diagnostics, QualifiedName, SemanticError, UnitSettings};
use sable_module::{ImportSummary, export_module, import_module};
use sable_registry::{SymbolId, SymbolTable};
use sable_syntax::SourceFile;

/// One compile unit.
///
/// Imports and files are added first; [`bind`](Unit::bind) runs once.
#[derive(Debug)]
pub struct Unit {
    ctx: BindContext,
    files: Vec<SourceFile>,
    file_indices: FxHashSet<u32>,
    imports: usize,
    summary: Option<BindSummary>,
}

impl Default for Unit {
    fn default() -> Self {
        Self::new(UnitSettings::default())
    }
}

impl Unit {
    pub fn new(settings: UnitSettings) -> Self {
        Self {
            ctx: BindContext::new(settings),
            files: Vec::new(),
            file_indices: FxHashSet::default(),
            imports: 0,
            summary: None,
        }
    }

    /// Add a syntax tree to bind.
    ///
    /// # Errors
    ///
    /// Fails if the unit is already bound, or if the file's index is taken
    /// or below the unit's file index base.
    pub fn add_file(&mut self, file: SourceFile) -> Result<(), UnitError> {
        if self.is_bound() {
            return Err(UnitError::AlreadyBound);
        }
        let base = self.ctx.settings.file_index_base;
        if file.file < base {
            return Err(UnitError::FileIndexBelowBase { file: file.file, base });
        }
        if !self.file_indices.insert(file.file) {
            return Err(UnitError::DuplicateFile(file.file));
        }
        self.files.push(file);
        Ok(())
    }

    /// Link a module file produced by another unit.
    ///
    /// A failed import leaves the unit as it was.
    pub fn import(&mut self, bytes: &[u8]) -> Result<ImportSummary, UnitError> {
        if self.is_bound() {
            return Err(UnitError::AlreadyBound);
        }
        let summary = import_module(&mut self.ctx.table, bytes, &self.ctx.settings)?;
        self.imports += 1;
        Ok(summary)
    }

    /// Bind every added file.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn bind(&mut self) -> Result<BindSummary, UnitError> {
        if self.is_bound() {
            return Err(UnitError::AlreadyBound);
        }
        if self.files.is_empty() {
            return Err(UnitError::NoSources);
        }
        let summary = bind_unit(&mut self.ctx, &self.files).map_err(UnitError::Bind)?;
        info!(
            unit = %self.ctx.settings.unit_name,
            files = self.files.len(),
            imports = self.imports,
            "unit bound"
        );
        self.summary = Some(summary);
        Ok(summary)
    }

    /// Serialize the unit's exported symbols.
    pub fn export(&self) -> Result<Vec<u8>, UnitError> {
        if !self.is_bound() {
            return Err(UnitError::NotBound);
        }
        Ok(export_module(&self.ctx.table, &self.ctx.settings)?)
    }

    pub fn is_bound(&self) -> bool {
        self.summary.is_some()
    }

    /// Counts from [`bind`](Unit::bind), once bound.
    pub fn summary(&self) -> Option<BindSummary> {
        self.summary
    }

    pub fn settings(&self) -> &UnitSettings {
        &self.ctx.settings
    }

    pub fn table(&self) -> &SymbolTable {
        &self.ctx.table
    }

    /// Resolve a dotted name from the global namespace.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ctx.table.lookup_qualified(&QualifiedName::parse(name))
    }

    /// Bound body of `function`.
    pub fn body(&self, function: SymbolId) -> Option<&BoundFunction> {
        self.ctx.body(function)
    }

    /// Number of bound function bodies.
    pub fn body_count(&self) -> usize {
        self.ctx.body_count()
    }
}

/// Errors from building or linking a unit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("unit has already been bound")]
    AlreadyBound,

    #[error("unit has not been bound yet")]
    NotBound,

    #[error("no source files added to unit")]
    NoSources,

    #[error("file index {0} is already used in this unit")]
    DuplicateFile(u32),

    #[error("file index {file} is below the unit's file index base {base}")]
    FileIndexBelowBase { file: u32, base: u32 },

    /// Binding failed; every collected error is kept.
    #[error("{0}")]
    Bind(Diagnostics),

    #[error(transparent)]
    Module(#[from] SemanticError),
}

impl UnitError {
    /// The underlying semantic errors, if any.
    pub fn into_errors(self) -> Vec<SemanticError> {
        match self {
            UnitError::Bind(diagnostics) => diagnostics.into_vec(),
            UnitError::Module(err) => vec![err],
            _ => Vec::new(),
        }
    }
}
