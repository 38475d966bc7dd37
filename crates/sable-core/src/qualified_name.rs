use std::fmt;

use serde::{Deserialize, Serialize};

/// A possibly dotted name as written in source (`System.Collections.List`).
///
/// Single-component names resolve through the lexical scope chain; names
/// with more than one component always resolve from the global namespace,
/// one component at a time.
///
/// # Examples
///
/// ```
/// use sable_core::QualifiedName;
///
/// let list = QualifiedName::parse("System.Collections.List");
/// assert_eq!(list.components().len(), 3);
/// assert_eq!(list.last(), "List");
/// assert_eq!(list.to_string(), "System.Collections.List");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    components: Vec<String>,
}

impl QualifiedName {
    /// Create a single-component name.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            components: vec![name.into()],
        }
    }

    /// Create from components.
    pub fn from_components(components: Vec<String>) -> Self {
        Self { components }
    }

    /// Parse a dotted string. Empty components are dropped.
    pub fn parse(s: &str) -> Self {
        Self {
            components: s
                .split('.')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// All components in order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether this name has more than one component.
    pub fn is_qualified(&self) -> bool {
        self.components.len() > 1
    }

    /// Whether this name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The final component, or `""` for an empty name.
    pub fn last(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or("")
    }

    /// The first component, or `""` for an empty name.
    pub fn first(&self) -> &str {
        self.components.first().map(String::as_str).unwrap_or("")
    }

    /// Everything but the last component.
    pub fn qualifier(&self) -> &[String] {
        match self.components.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Append a component, returning a new name.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(name.into());
        Self { components }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
