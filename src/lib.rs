//! # bibimport
//!
//! A BibTeX import library that favors recovery over rejection: the kind of
//! slightly damaged files reference managers accumulate (missing citation
//! keys, missing commas, duplicate keys, home-grown entry types) still
//! import, with warnings describing what was repaired.
//!
//! Beyond entries it understands `@string` macros with `#` concatenation,
//! `@preamble` blocks, and the tagged `@comment` conventions reference
//! managers use to stash metadata and custom entry type declarations inside
//! an ordinary BibTeX file.
//!
//! ## Example
//!
//! ```
//! let input = r#"
//!     @string{ap = "Annalen der Physik"}
//!
//!     @article{einstein1905,
//!         author = "Albert Einstein",
//!         title = {Zur Elektrodynamik bewegter K{\"o}rper},
//!         journal = ap,
//!         year = 1905
//!     }
//! "#;
//!
//! let result = bibimport::parse(input)?;
//! let entry = &result.database.entries()[0];
//! assert_eq!(entry.key(), "einstein1905");
//! assert_eq!(entry.get("journal"), Some("Annalen der Physik"));
//! assert_eq!(entry.get("year"), Some("1905"));
//! assert!(!result.has_warnings());
//! # Ok::<(), bibimport::Error>(())
//! ```
//!
//! ## Value formats
//!
//! By default, whitespace inside braced values is normalized and the line
//! wrapping the writer inserts is undone, so values compare equal however
//! they were wrapped on disk. Pass [`ValueFormat::Exact`] through
//! [`ParseOptions`] to keep braced values byte-for-byte instead.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::multiple_crate_versions
)]

pub mod error;
pub mod model;
pub mod reformat;

mod database;
mod parser;
mod writer;

pub use database::{Database, ParseOptions, ParseResult, ValueFormat};
pub use error::{Error, Result, Warning};
pub use model::{CustomEntryType, Entry, EntryType, Field};
pub use writer::{to_file, to_string, Writer, WriterConfig};

/// Parse a BibTeX database with default options
///
/// Returns the database plus warnings for everything that was repaired
/// rather than rejected. See [`ParseOptions`] to control value formatting.
pub fn parse(input: &str) -> Result<ParseResult<'_>> {
    ParseOptions::new().parse(input)
}

/// Parse a BibTeX file with default options
///
/// Reads the whole file and returns an owned result with no ties to the
/// file's buffer.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<ParseResult<'static>> {
    let content = std::fs::read_to_string(path)?;
    ParseOptions::new()
        .parse(&content)
        .map(ParseResult::into_owned)
}
