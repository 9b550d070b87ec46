//! Crate-wide error type for anything that crosses an API boundary as a
//! `Result` rather than accumulating as a [`crate::diagnostics::Diagnostic`].
//!
//! The lexer, parser and binder never fail fast — they always return
//! data plus a diagnostic list, even on malformed input. This enum
//! exists for the layers that *are* fail-fast by design: I/O, and
//! registry registration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShiftlefterError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("step definition pattern is variadic: {pattern}")]
    StepDefVariadic { pattern: String },

    #[error(
        "duplicate step definition for pattern `{pattern}` (first registered at {first}, again at {second})"
    )]
    StepDefDuplicate {
        pattern: String,
        first: String,
        second: String,
    },

    #[error("invalid regular expression `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, ShiftlefterError>;
