//! Data model for BibTeX entries, custom entry types, and tagged comments

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Comment-body prefix marking a structured metadata comment
///
/// These tag literals are the ones JabRef writes, so databases produced by it
/// (and by its predecessor BibKeeper, see
/// [`META_COMMENT_PREFIX_LEGACY`]) import cleanly.
pub const META_COMMENT_PREFIX: &str = "jabref-meta:";

/// Backward-compatible metadata prefix written by old BibKeeper versions
pub const META_COMMENT_PREFIX_LEGACY: &str = "bibkeeper-meta:";

/// Comment-body prefix marking a custom entry type declaration
pub const ENTRYTYPE_COMMENT_PREFIX: &str = "jabref-entrytype:";

/// The field holding a list of file paths, where runs of spaces are
/// significant and must survive reformatting
pub const FILE_FIELD: &str = "file";

/// A BibTeX entry (article, book, etc.)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<'a> {
    /// Internal identifier, distinct from the citation key
    id: u64,
    /// Entry type (article, book, inproceedings, etc.)
    pub ty: EntryType<'a>,
    /// Citation key
    pub key: Cow<'a, str>,
    /// Fields (author, title, year, etc.); names lower-cased and unique
    fields: Vec<Field<'a>>,
}

impl<'a> Entry<'a> {
    /// Create a new entry
    #[must_use]
    pub const fn new(id: u64, ty: EntryType<'a>, key: Cow<'a, str>) -> Self {
        Self {
            id,
            ty,
            key,
            fields: Vec::new(),
        }
    }

    /// Get the opaque internal id
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the entry type
    #[must_use]
    pub const fn entry_type(&self) -> &EntryType<'a> {
        &self.ty
    }

    /// Get the citation key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get a field value by name (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_ref())
    }

    /// Get all fields, in insertion order
    #[must_use]
    pub fn fields(&self) -> &[Field<'a>] {
        &self.fields
    }

    /// Set a field value
    ///
    /// Names are lower-cased and kept unique. Empty values are omitted rather
    /// than stored. A repeated `author` or `editor` is concatenated onto the
    /// existing value with `" and "`; any other repeated field overwrites.
    pub fn set_field(&mut self, name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) {
        let mut name = name.into();
        let value = value.into();
        if value.is_empty() {
            return;
        }
        if name.chars().any(char::is_uppercase) {
            name = Cow::Owned(name.to_lowercase());
        }
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) if name == "author" || name == "editor" => {
                field.value = Cow::Owned(format!("{} and {}", field.value, value));
            }
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
    }

    /// Check if the entry has all fields its built-in type requires
    ///
    /// Custom and unresolved types carry their requirements in the database's
    /// custom-type table and always pass here.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.ty
            .required_fields()
            .iter()
            .all(|&field| self.get(field).is_some())
    }

    /// Convert to owned version
    #[must_use]
    pub fn into_owned(self) -> Entry<'static> {
        Entry {
            id: self.id,
            ty: self.ty.into_owned(),
            key: Cow::Owned(self.key.into_owned()),
            fields: self.fields.into_iter().map(Field::into_owned).collect(),
        }
    }
}

/// BibTeX entry type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EntryType<'a> {
    /// Article from a journal
    Article,
    /// Book with publisher
    Book,
    /// Bound work without a publisher
    Booklet,
    /// Part of a book
    InBook,
    /// Titled part of a book with its own author
    InCollection,
    /// Article in conference proceedings
    InProceedings,
    /// Technical documentation
    Manual,
    /// Master's thesis
    MastersThesis,
    /// Miscellaneous
    Misc,
    /// `PhD` thesis
    PhdThesis,
    /// Conference proceedings
    Proceedings,
    /// Technical report
    TechReport,
    /// Unpublished work
    Unpublished,
    /// Generic fallback type
    Other,
    /// User-declared type, resolved against a [`CustomEntryType`] declaration
    Custom(Cow<'a, str>),
    /// Type name seen before (or without) a matching declaration; rebound to
    /// `Custom` or `Other` when the parse finishes
    Unknown(Cow<'a, str>),
}

impl<'a> EntryType<'a> {
    /// Parse from string (case-insensitive); unrecognized names become
    /// [`EntryType::Unknown`]
    #[must_use]
    pub fn parse(s: &'a str) -> Self {
        match s.to_lowercase().as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "booklet" => Self::Booklet,
            "inbook" => Self::InBook,
            "incollection" => Self::InCollection,
            "inproceedings" | "conference" => Self::InProceedings,
            "manual" => Self::Manual,
            "mastersthesis" => Self::MastersThesis,
            "misc" => Self::Misc,
            "phdthesis" => Self::PhdThesis,
            "proceedings" => Self::Proceedings,
            "techreport" => Self::TechReport,
            "unpublished" => Self::Unpublished,
            "other" => Self::Other,
            _ => Self::Unknown(Cow::Borrowed(s)),
        }
    }

    /// Get required fields for this entry type
    #[must_use]
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Article => &["author", "title", "journal", "year"],
            Self::Book => &["author", "title", "publisher", "year"],
            Self::Booklet | Self::Manual => &["title"],
            Self::InBook => &["author", "title", "chapter", "publisher", "year"],
            Self::InCollection => &["author", "title", "booktitle", "publisher", "year"],
            Self::InProceedings => &["author", "title", "booktitle", "year"],
            Self::MastersThesis | Self::PhdThesis => &["author", "title", "school", "year"],
            Self::Proceedings => &["title", "year"],
            Self::TechReport => &["author", "title", "institution", "year"],
            Self::Unpublished => &["author", "title", "note"],
            Self::Misc | Self::Other | Self::Custom(_) | Self::Unknown(_) => &[],
        }
    }

    /// Get optional fields for this entry type
    #[must_use]
    pub const fn optional_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Article => &["volume", "number", "pages", "month", "note"],
            Self::Book => &[
                "editor", "volume", "number", "series", "address", "edition", "month", "note",
            ],
            Self::Booklet => &["author", "howpublished", "address", "month", "year", "note"],
            Self::InBook => &[
                "editor", "pages", "volume", "number", "series", "address", "edition", "month",
                "note",
            ],
            Self::InCollection => &[
                "editor", "volume", "number", "series", "type", "chapter", "pages", "address",
                "edition", "month", "note",
            ],
            Self::InProceedings => &[
                "editor",
                "volume",
                "number",
                "series",
                "pages",
                "address",
                "month",
                "organization",
                "publisher",
                "note",
            ],
            Self::Manual => &["author", "organization", "address", "edition", "month", "year"],
            Self::MastersThesis | Self::PhdThesis => &["type", "address", "month", "note"],
            Self::Misc => &["author", "title", "howpublished", "month", "year", "note"],
            Self::Proceedings => &[
                "editor",
                "volume",
                "number",
                "series",
                "address",
                "month",
                "organization",
                "publisher",
                "note",
            ],
            Self::TechReport => &["type", "number", "address", "month", "note"],
            Self::Unpublished => &["month", "year"],
            Self::Other | Self::Custom(_) | Self::Unknown(_) => &[],
        }
    }

    /// Convert to owned version
    #[must_use]
    pub fn into_owned(self) -> EntryType<'static> {
        match self {
            Self::Custom(s) => EntryType::Custom(Cow::Owned(s.into_owned())),
            Self::Unknown(s) => EntryType::Unknown(Cow::Owned(s.into_owned())),
            Self::Article => EntryType::Article,
            Self::Book => EntryType::Book,
            Self::Booklet => EntryType::Booklet,
            Self::InBook => EntryType::InBook,
            Self::InCollection => EntryType::InCollection,
            Self::InProceedings => EntryType::InProceedings,
            Self::Manual => EntryType::Manual,
            Self::MastersThesis => EntryType::MastersThesis,
            Self::Misc => EntryType::Misc,
            Self::PhdThesis => EntryType::PhdThesis,
            Self::Proceedings => EntryType::Proceedings,
            Self::TechReport => EntryType::TechReport,
            Self::Unpublished => EntryType::Unpublished,
            Self::Other => EntryType::Other,
        }
    }
}

impl fmt::Display for EntryType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Article => write!(f, "article"),
            Self::Book => write!(f, "book"),
            Self::Booklet => write!(f, "booklet"),
            Self::InBook => write!(f, "inbook"),
            Self::InCollection => write!(f, "incollection"),
            Self::InProceedings => write!(f, "inproceedings"),
            Self::Manual => write!(f, "manual"),
            Self::MastersThesis => write!(f, "mastersthesis"),
            Self::Misc => write!(f, "misc"),
            Self::PhdThesis => write!(f, "phdthesis"),
            Self::Proceedings => write!(f, "proceedings"),
            Self::TechReport => write!(f, "techreport"),
            Self::Unpublished => write!(f, "unpublished"),
            Self::Other => write!(f, "other"),
            Self::Custom(s) | Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// A field in a BibTeX entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field<'a> {
    /// Field name, lower-cased
    pub name: Cow<'a, str>,
    /// Field value; never empty
    pub value: Cow<'a, str>,
}

impl Field<'_> {
    /// Convert to owned version
    #[must_use]
    pub fn into_owned(self) -> Field<'static> {
        Field {
            name: Cow::Owned(self.name.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// A user-declared entry type with its own field schema
///
/// Declared inside a tagged `@comment` block:
///
/// ```text
/// @comment{jabref-entrytype: lecture: req[author;title;year] opt[note]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomEntryType {
    /// Type name as declared
    pub name: String,
    /// Required field names
    pub required: Vec<String>,
    /// Optional field names
    pub optional: Vec<String>,
}

impl CustomEntryType {
    /// Parse a declaration from a tagged comment body
    ///
    /// Returns `None` if the body is not a well-formed declaration.
    #[must_use]
    pub fn parse_comment(comment: &str) -> Option<Self> {
        let rest = comment
            .trim_start()
            .strip_prefix(ENTRYTYPE_COMMENT_PREFIX)?;
        let (name, schema) = rest.split_once(':')?;
        let required = field_list(schema, "req")?;
        let optional = field_list(schema, "opt").unwrap_or_default();
        Some(Self {
            name: name.trim().to_string(),
            required,
            optional,
        })
    }

    /// Serialize back to the tagged comment body form
    #[must_use]
    pub fn as_comment(&self) -> String {
        format!(
            "{ENTRYTYPE_COMMENT_PREFIX} {}: req[{}] opt[{}]",
            self.name,
            self.required.join(";"),
            self.optional.join(";")
        )
    }
}

/// Extract a `;`-separated field list from a `tag[...]` section
fn field_list(schema: &str, tag: &str) -> Option<Vec<String>> {
    let start = schema.find(&format!("{tag}["))? + tag.len() + 1;
    let end = schema[start..].find(']')? + start;
    Some(
        schema[start..end]
            .split(';')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parse() {
        assert_eq!(EntryType::parse("Article"), EntryType::Article);
        assert_eq!(EntryType::parse("CONFERENCE"), EntryType::InProceedings);
        assert_eq!(
            EntryType::parse("lecture"),
            EntryType::Unknown(Cow::Borrowed("lecture"))
        );
    }

    #[test]
    fn test_set_field_lowercases_and_overwrites() {
        let mut entry = Entry::new(1, EntryType::Misc, Cow::Borrowed("k"));
        entry.set_field("Title", "First");
        entry.set_field("title", "Second");
        assert_eq!(entry.fields().len(), 1);
        assert_eq!(entry.get("title"), Some("Second"));
    }

    #[test]
    fn test_set_field_merges_repeated_author() {
        let mut entry = Entry::new(1, EntryType::Article, Cow::Borrowed("k"));
        entry.set_field("author", "A");
        entry.set_field("author", "B");
        assert_eq!(entry.get("author"), Some("A and B"));
    }

    #[test]
    fn test_set_field_omits_empty_values() {
        let mut entry = Entry::new(1, EntryType::Misc, Cow::Borrowed("k"));
        entry.set_field("note", "");
        assert!(entry.fields().is_empty());
    }

    #[test]
    fn test_custom_type_comment_round_trip() {
        let ty = CustomEntryType {
            name: "lecture".into(),
            required: vec!["author".into(), "title".into()],
            optional: vec!["note".into()],
        };
        let parsed = CustomEntryType::parse_comment(&ty.as_comment()).unwrap();
        assert_eq!(parsed, ty);
    }

    #[test]
    fn test_custom_type_comment_empty_optionals() {
        let ty = CustomEntryType::parse_comment("jabref-entrytype: customtype: req[x] opt[]")
            .unwrap();
        assert_eq!(ty.name, "customtype");
        assert_eq!(ty.required, vec!["x".to_string()]);
        assert!(ty.optional.is_empty());
    }

    #[test]
    fn test_custom_type_comment_rejects_garbage() {
        assert!(CustomEntryType::parse_comment("this is a plain comment").is_none());
        assert!(CustomEntryType::parse_comment("jabref-entrytype: nameonly").is_none());
    }

    #[test]
    fn test_is_valid_checks_required_fields() {
        let mut entry = Entry::new(1, EntryType::Article, Cow::Borrowed("k"));
        entry.set_field("author", "A");
        entry.set_field("title", "T");
        entry.set_field("journal", "J");
        assert!(!entry.is_valid());
        entry.set_field("year", "2020");
        assert!(entry.is_valid());
    }
}
