//! Error and warning types for the bibimport crate

use serde::Serialize;
use thiserror::Error;

/// Result type for bibimport operations
pub type Result<T> = std::result::Result<T, Error>;

/// A fatal error that aborts the whole parse
///
/// A stream that cannot be parsed at all yields `Err`; everything that can be
/// tolerated is reported as a [`Warning`] on the parse result instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Syntax error with location information
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        /// Line number (1-indexed)
        line: usize,
        /// Column number (1-indexed)
        column: usize,
        /// Error message
        message: String,
        /// Optional source snippet
        snippet: Option<String>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A recoverable condition recorded while parsing continues
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Warning {
    /// A second entry used an already-taken citation key; both entries are kept
    #[error("duplicate citation key '{0}'")]
    DuplicateKey(String),

    /// A `@string` name was defined twice; the first definition wins
    #[error("duplicate string name '{0}', keeping the first definition")]
    DuplicateString(String),

    /// An entry type never resolved to a built-in or declared custom type
    #[error("unknown entry type '{0}', falling back to 'other'")]
    UnresolvedEntryType(String),
}
