//! BibTeX database and parse configuration

use crate::error::{Result, Warning};
use crate::model::{CustomEntryType, Entry, EntryType};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::borrow::Cow;

/// Whitespace policy for braced field values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ValueFormat {
    /// Collapse insignificant whitespace and undo writer line-wrapping, so a
    /// value compares equal no matter how it was wrapped on disk (default)
    #[default]
    Normalize,
    /// Keep every character of every braced value verbatim
    Exact,
}

/// Parser configuration, builder style
///
/// # Examples
///
/// ```
/// use bibimport::{ParseOptions, ValueFormat};
///
/// let result = ParseOptions::new()
///     .format(ValueFormat::Exact)
///     .parse("@misc{k, note = {kept  as-is}}")?;
/// assert_eq!(result.database.entries()[0].get("note"), Some("kept  as-is"));
/// # Ok::<(), bibimport::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    format: ValueFormat,
}

impl ParseOptions {
    /// Create options with the default [`ValueFormat::Normalize`] policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the whitespace policy for braced values
    #[must_use]
    pub const fn format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Parse a BibTeX database with these options
    pub fn parse<'a>(&self, input: &'a str) -> Result<ParseResult<'a>> {
        crate::parser::parse_database(input, self.format)
    }
}

/// A successful parse: the database plus everything worth telling the user
#[derive(Debug, Clone)]
pub struct ParseResult<'a> {
    /// The assembled database
    pub database: Database<'a>,
    /// Recoverable conditions encountered while parsing
    pub warnings: Vec<Warning>,
}

impl ParseResult<'_> {
    /// Whether any warnings were recorded
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Convert to an owned result with no ties to the input buffer
    #[must_use]
    pub fn into_owned(self) -> ParseResult<'static> {
        ParseResult {
            database: self.database.into_owned(),
            warnings: self.warnings,
        }
    }
}

/// A parsed BibTeX database
#[derive(Debug, Clone, Default)]
pub struct Database<'a> {
    entries: Vec<Entry<'a>>,
    strings: AHashMap<Cow<'a, str>, Cow<'a, str>>,
    preambles: Vec<Cow<'a, str>>,
    comments: Vec<Cow<'a, str>>,
    /// Custom type declarations, keyed by lower-cased name
    custom_types: AHashMap<String, CustomEntryType>,
    metadata: AHashMap<String, String>,
}

impl<'a> Database<'a> {
    /// Create an empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all entries, in input order
    #[must_use]
    pub fn entries(&self) -> &[Entry<'a>] {
        &self.entries
    }

    /// Find an entry by citation key
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<&Entry<'a>> {
        self.entries.iter().find(|e| e.key() == key)
    }

    /// Get all string macro definitions
    #[must_use]
    pub fn strings(&self) -> &AHashMap<Cow<'a, str>, Cow<'a, str>> {
        &self.strings
    }

    /// Look up a string macro definition by name
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(Cow::as_ref)
    }

    /// Get all preambles, in input order
    #[must_use]
    pub fn preambles(&self) -> &[Cow<'a, str>] {
        &self.preambles
    }

    /// Get all free-form comments, in input order
    #[must_use]
    pub fn comments(&self) -> &[Cow<'a, str>] {
        &self.comments
    }

    /// Look up a custom entry type declaration (case-insensitive)
    #[must_use]
    pub fn custom_type(&self, name: &str) -> Option<&CustomEntryType> {
        self.custom_types.get(&name.to_lowercase())
    }

    /// Get all custom entry type declarations, keyed by lower-cased name
    #[must_use]
    pub fn custom_types(&self) -> &AHashMap<String, CustomEntryType> {
        &self.custom_types
    }

    /// Get the metadata extracted from tagged comments
    #[must_use]
    pub fn metadata(&self) -> &AHashMap<String, String> {
        &self.metadata
    }

    /// Add an entry
    pub fn add_entry(&mut self, entry: Entry<'a>) {
        self.entries.push(entry);
    }

    /// Define a string macro; an existing definition wins
    pub fn define_string(&mut self, name: Cow<'a, str>, value: Cow<'a, str>) {
        self.strings.entry(name).or_insert(value);
    }

    /// Add a preamble
    pub fn add_preamble(&mut self, preamble: Cow<'a, str>) {
        self.preambles.push(preamble);
    }

    /// Add a free-form comment
    pub fn add_comment(&mut self, comment: Cow<'a, str>) {
        self.comments.push(comment);
    }

    /// Declare a custom entry type; a later declaration replaces an earlier
    /// one of the same name
    pub fn define_custom_type(&mut self, ty: CustomEntryType) {
        self.custom_types.insert(ty.name.to_lowercase(), ty);
    }

    /// Set a metadata value
    pub fn set_metadata(&mut self, key: String, value: String) {
        self.metadata.insert(key, value);
    }

    /// Resolve entry types left unknown during the first pass
    ///
    /// Runs after the whole input was read, so declarations that follow their
    /// uses still apply. Unknown types with a declaration become
    /// [`EntryType::Custom`]; the rest fall back to [`EntryType::Other`] with
    /// one warning per distinct type name.
    pub(crate) fn resolve_entry_types(&mut self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let mut warned: AHashSet<String> = AHashSet::new();
        let Self {
            entries,
            custom_types,
            ..
        } = self;
        for entry in entries {
            if let EntryType::Unknown(name) = &entry.ty {
                let lower = name.to_lowercase();
                if let Some(declared) = custom_types.get(&lower) {
                    entry.ty = EntryType::Custom(Cow::Owned(declared.name.clone()));
                } else {
                    if warned.insert(lower) {
                        warnings.push(Warning::UnresolvedEntryType(name.to_string()));
                    }
                    entry.ty = EntryType::Other;
                }
            }
        }
        warnings
    }

    /// Convert to an owned database with no ties to the input buffer
    #[must_use]
    pub fn into_owned(self) -> Database<'static> {
        Database {
            entries: self.entries.into_iter().map(Entry::into_owned).collect(),
            strings: self
                .strings
                .into_iter()
                .map(|(k, v)| (Cow::Owned(k.into_owned()), Cow::Owned(v.into_owned())))
                .collect(),
            preambles: self
                .preambles
                .into_iter()
                .map(|p| Cow::Owned(p.into_owned()))
                .collect(),
            comments: self
                .comments
                .into_iter()
                .map(|c| Cow::Owned(c.into_owned()))
                .collect(),
            custom_types: self.custom_types,
            metadata: self.metadata,
        }
    }
}
