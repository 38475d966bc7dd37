//! Error types for semantic analysis.
//!
//! Every failure the binder, the template engine, and the module linker can
//! report is a [`SemanticError`]. Each variant carries the span that
//! triggered it, and some carry reference spans (the earlier declaration of a
//! duplicate, the tied candidates of an ambiguous call) so the driver can
//! print them next to the primary location.
//!
//! Absence during lookup is never an error: lookups return `Option`, and
//! only callers that require a result turn `None` into
//! [`SemanticError::SymbolNotFound`].
//!
//! [`Diagnostics`] collects errors across independent declarations for the
//! driver to print.

use thiserror::Error;

use crate::{ModuleVersion, Span, TypeId};

/// Result alias used throughout the workspace.
pub type Result<T, E = SemanticError> = std::result::Result<T, E>;

/// Errors produced while binding a unit or importing a module.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    /// A name was declared twice in the same scope.
    #[error("at {span}: '{name}' is already defined (previous definition at {previous})")]
    DuplicateDefinition {
        name: String,
        span: Span,
        previous: Span,
    },

    /// A name required by the program could not be found.
    #[error("at {span}: symbol '{name}' not found")]
    SymbolNotFound { name: String, span: Span },

    /// A name was found through more than one `using` directive.
    #[error("at {span}: '{name}' is ambiguous: could be {}", .candidates.join(" or "))]
    AmbiguousSymbol {
        name: String,
        candidates: Vec<String>,
        candidate_spans: Vec<Span>,
        span: Span,
    },

    /// No candidate of an overload group accepts the arguments.
    #[error("at {span}: no viable overload of '{name}' for arguments ({arguments})")]
    NoViableOverload {
        name: String,
        arguments: String,
        candidate_spans: Vec<Span>,
        span: Span,
    },

    /// More than one candidate is a best match.
    #[error("at {span}: call to '{name}' is ambiguous between {}", .candidates.join(", "))]
    AmbiguousOverload {
        name: String,
        candidates: Vec<String>,
        candidate_spans: Vec<Span>,
        span: Span,
    },

    /// No conversion exists between two types in the requested mode.
    #[error("at {span}: cannot convert '{from}' to '{to}'")]
    NoConversion { from: String, to: String, span: Span },

    /// A template instance was requested while it is being instantiated.
    #[error("at {span}: template instance '{name}' depends on itself")]
    CyclicTemplateDefinition { name: String, span: Span },

    /// A typedef, constant, or class definition refers back to itself.
    #[error("at {span}: definition of '{name}' is cyclic")]
    CyclicDefinition { name: String, span: Span },

    /// A template parameter without a default was left unsupplied.
    #[error("at {span}: missing type argument for parameter '{parameter}' of '{template}'")]
    MissingTypeArgument {
        template: String,
        parameter: String,
        span: Span,
    },

    /// More type arguments than template parameters.
    #[error("at {span}: '{template}' takes {expected} type arguments, {found} given")]
    TooManyTypeArguments {
        template: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// Type arguments were applied to a non-template symbol.
    #[error("at {span}: '{name}' is not a template")]
    NotATemplate { name: String, span: Span },

    /// A name that must denote a type denotes something else.
    #[error("at {span}: '{name}' is not a type")]
    NotAType { name: String, span: Span },

    /// A name used as a value denotes a type, namespace, or function group.
    #[error("at {span}: '{name}' is not a value")]
    NotAValue { name: String, span: Span },

    /// An abstract class was constructed.
    #[error("at {span}: cannot construct abstract class '{name}'")]
    AbstractInstantiation { name: String, span: Span },

    /// A qualifier component is not a namespace, class, or enum.
    #[error("at {span}: '{name}' is not a namespace or type scope")]
    NotAScope { name: String, span: Span },

    /// A type identity was referenced but never registered.
    #[error("at {span}: unresolved type {type_id}")]
    UnresolvedType { type_id: TypeId, span: Span },

    /// A module file was written by an incompatible version.
    #[error("module version mismatch: found {found}, expected {expected}")]
    ModuleVersionMismatch {
        found: ModuleVersion,
        expected: ModuleVersion,
    },

    /// A module file is truncated or malformed.
    #[error("corrupt module file: {detail}")]
    CorruptModuleFile { detail: String },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SemanticError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            SemanticError::DuplicateDefinition { span, .. } => *span,
            SemanticError::SymbolNotFound { span, .. } => *span,
            SemanticError::AmbiguousSymbol { span, .. } => *span,
            SemanticError::NoViableOverload { span, .. } => *span,
            SemanticError::AmbiguousOverload { span, .. } => *span,
            SemanticError::NoConversion { span, .. } => *span,
            SemanticError::CyclicTemplateDefinition { span, .. } => *span,
            SemanticError::CyclicDefinition { span, .. } => *span,
            SemanticError::MissingTypeArgument { span, .. } => *span,
            SemanticError::TooManyTypeArguments { span, .. } => *span,
            SemanticError::NotATemplate { span, .. } => *span,
            SemanticError::NotAType { span, .. } => *span,
            SemanticError::NotAValue { span, .. } => *span,
            SemanticError::AbstractInstantiation { span, .. } => *span,
            SemanticError::NotAScope { span, .. } => *span,
            SemanticError::UnresolvedType { span, .. } => *span,
            SemanticError::ModuleVersionMismatch { .. } => Span::default(),
            SemanticError::CorruptModuleFile { .. } => Span::default(),
            SemanticError::Internal { .. } => Span::default(),
        }
    }

    /// Secondary locations related to this error.
    pub fn references(&self) -> &[Span] {
        match self {
            SemanticError::DuplicateDefinition { previous, .. } => std::slice::from_ref(previous),
            SemanticError::AmbiguousSymbol {
                candidate_spans, ..
            }
            | SemanticError::NoViableOverload {
                candidate_spans, ..
            }
            | SemanticError::AmbiguousOverload {
                candidate_spans, ..
            } => candidate_spans,
            _ => &[],
        }
    }

    /// Shorthand for [`SemanticError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        SemanticError::Internal {
            message: message.into(),
        }
    }

    /// Shorthand for [`SemanticError::CorruptModuleFile`].
    pub fn corrupt(detail: impl Into<String>) -> Self {
        SemanticError::CorruptModuleFile {
            detail: detail.into(),
        }
    }
}

/// A collection of semantic errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    errors: Vec<SemanticError>,
}

impl Diagnostics {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error.
    pub fn push(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    /// Record the error of a failed result, passing successes through.
    pub fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(error);
                None
            }
        }
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &SemanticError> {
        self.errors.iter()
    }

    /// Move all errors out, leaving the collection empty.
    pub fn take(&mut self) -> Diagnostics {
        std::mem::take(self)
    }

    /// Convert to a Vec of errors.
    pub fn into_vec(self) -> Vec<SemanticError> {
        self.errors
    }

    /// `Ok(())` if empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = SemanticError;
    type IntoIter = std::vec::IntoIter<SemanticError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a SemanticError;
    type IntoIter = std::slice::Iter<'a, SemanticError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<SemanticError> for Diagnostics {
    fn from(error: SemanticError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_definition_references_previous() {
        let err = SemanticError::DuplicateDefinition {
            name: "x".into(),
            span: Span::new(0, 4, 2, 3),
            previous: Span::new(0, 1, 2, 3),
        };
        assert_eq!(err.span(), Span::new(0, 4, 2, 3));
        assert_eq!(err.references(), &[Span::new(0, 1, 2, 3)]);
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn ambiguous_overload_lists_candidates() {
        let err = SemanticError::AmbiguousOverload {
            name: "f".into(),
            candidates: vec!["f(int, long)".into(), "f(long, int)".into()],
            candidate_spans: vec![Span::new(0, 1, 0, 1), Span::new(0, 2, 0, 1)],
            span: Span::new(0, 9, 0, 1),
        };
        assert_eq!(err.references().len(), 2);
        assert_eq!(
            err.to_string(),
            "at 0:9:0: call to 'f' is ambiguous between f(int, long), f(long, int)"
        );
    }

    #[test]
    fn version_mismatch_message() {
        let err = SemanticError::ModuleVersionMismatch {
            found: ModuleVersion::new(2, 0),
            expected: ModuleVersion::new(1, 0),
        };
        assert_eq!(
            err.to_string(),
            "module version mismatch: found 2.0, expected 1.0"
        );
        assert_eq!(err.span(), Span::default());
    }

    #[test]
    fn diagnostics_collect() {
        let mut diags = Diagnostics::new();
        assert!(diags.record(Ok::<_, SemanticError>(3)).is_some());
        assert!(diags
            .record::<()>(Err(SemanticError::internal("boom")))
            .is_none());
        assert_eq!(diags.len(), 1);
        assert!(diags.clone().into_result().is_err());
        assert!(diags.take().into_vec().len() == 1);
        assert!(diags.is_empty());
    }
}
