//! Source location tracking for diagnostics.
//!
//! Provides [`Span`], the location every symbol and every error carries.
//! A span names the source file by index (the driver owns the file list),
//! the line, and a byte range on that line.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A span of source code.
///
/// Spans are produced by the external parser and copied verbatim into
/// symbols and module files, so the layout is fixed: file index, line,
/// start and end byte offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Index of the source file within the compile unit's file list.
    pub file: u32,
    /// Line number (1-indexed).
    pub line: u32,
    /// Start byte offset.
    pub start: u32,
    /// End byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    #[inline]
    pub const fn new(file: u32, line: u32, start: u32, end: u32) -> Self {
        Self {
            file,
            line,
            start,
            end,
        }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub const fn point(file: u32, line: u32, offset: u32) -> Self {
        Self {
            file,
            line,
            start: offset,
            end: offset,
        }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Merge two spans of the same file into one that covers both.
    ///
    /// The line of the earlier span is kept.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span {
            file: self.file,
            line: self.line.min(other.line),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}..{}", self.file, self.line, self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(0, 1, 5, 15);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());

        let empty = Span::point(0, 1, 5);
        assert!(empty.is_empty());
    }

    #[test]
    fn span_display() {
        let span = Span::new(2, 3, 15, 20);
        assert_eq!(format!("{}", span), "2:3:15");
        assert_eq!(format!("{:?}", span), "2:3:15..20");
    }

    #[test]
    fn span_merge_same_file() {
        let a = Span::new(0, 1, 5, 8);
        let b = Span::new(0, 2, 10, 13);
        let merged = a.merge(b);

        assert_eq!(merged.line, 1);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 13);
    }

    #[test]
    fn span_merge_reverse_order() {
        let a = Span::new(0, 4, 10, 13);
        let b = Span::new(0, 3, 5, 8);
        let merged = a.merge(b);

        assert_eq!(merged.line, 3);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 13);
    }

    #[test]
    fn span_merge_different_files_keeps_self() {
        let a = Span::new(0, 1, 5, 8);
        let b = Span::new(1, 1, 0, 40);
        assert_eq!(a.merge(b), a);
    }
}
