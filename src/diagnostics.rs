//! Diagnostic records shared by the lexer, parser, pickle compiler and
//! binder. These never carry a backtrace or panic payload — they are
//! plain data so a report (see [`crate::report`]) can render them
//! deterministically.

use std::fmt;
use std::path::{Path, PathBuf};

/// A position within a source file. Columns count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }

    /// The `-` sentinel used when a diagnostic has no backing file (stdin).
    pub fn stdin(line: usize, column: usize) -> Self {
        SourceLocation::new("-", line, column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// The taxonomy of diagnostic kinds produced across the core (spec. §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnexpectedToken,
    UnexpectedEof,
    UnterminatedDocstring,
    InvalidTag,
    RowWidthMismatch,
    DuplicateFeature,
    NoSuchFeature,
    OrphanTags,
    MissingExamples,
    UndefinedPlaceholder,
    EmptyExamples,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnexpectedToken => "unexpected-token",
            DiagnosticKind::UnexpectedEof => "unexpected-eof",
            DiagnosticKind::UnterminatedDocstring => "unterminated-docstring",
            DiagnosticKind::InvalidTag => "invalid-tag",
            DiagnosticKind::RowWidthMismatch => "row-width-mismatch",
            DiagnosticKind::DuplicateFeature => "duplicate-feature",
            DiagnosticKind::NoSuchFeature => "no-such-feature",
            DiagnosticKind::OrphanTags => "orphan-tags",
            DiagnosticKind::MissingExamples => "missing-examples",
            DiagnosticKind::UndefinedPlaceholder => "undefined-placeholder",
            DiagnosticKind::EmptyExamples => "empty-examples",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{path, line, column, kind, message}` — the one diagnostic shape used
/// by every accumulating stage. The lexer and parser never fail fast:
/// they push one of these and keep going rather than aborting on the
/// first problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(location: SourceLocation, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            location,
            kind,
            message: message.into(),
        }
    }
}

/// Stable text format: `path:line:col: kind: message`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.kind, self.message)
    }
}

/// Render a path the way diagnostics want it: `-` when absent (stdin).
pub fn display_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from("-"),
    }
}
