//! BibTeX writer for serializing databases
//!
//! Values are wrapped at the configured column with the `\n\t` continuation
//! the normalizing reader recognizes, so a write/parse round trip restores
//! the original values.

use crate::database::Database;
use crate::error::Result;
use crate::model::{Entry, META_COMMENT_PREFIX};
use crate::reformat;
use std::io::{self, Write};

/// Configuration for writing BibTeX
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Indentation string (default: "  ")
    pub indent: String,
    /// Column at which field values wrap onto a continuation line
    /// (default: 65)
    pub wrap_column: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            wrap_column: 65,
        }
    }
}

/// BibTeX writer
#[derive(Debug)]
pub struct Writer<W: Write> {
    writer: W,
    config: WriterConfig,
}

impl<W: Write> Writer<W> {
    /// Create a new writer with default configuration
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            config: WriterConfig::default(),
        }
    }

    /// Create a new writer with custom configuration
    pub const fn with_config(writer: W, config: WriterConfig) -> Self {
        Self { writer, config }
    }

    /// Write a complete database
    ///
    /// String definitions, metadata and custom type declarations are sorted
    /// by name so output is stable across runs.
    pub fn write_database(&mut self, db: &Database<'_>) -> io::Result<()> {
        for preamble in db.preambles() {
            self.write_preamble(preamble)?;
            writeln!(self.writer)?;
        }

        let mut strings: Vec<_> = db.strings().iter().collect();
        strings.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in strings {
            self.write_string(name, value)?;
            writeln!(self.writer)?;
        }

        for (i, entry) in db.entries().iter().enumerate() {
            if i > 0 {
                writeln!(self.writer)?;
            }
            self.write_entry(entry)?;
        }

        for comment in db.comments() {
            writeln!(self.writer)?;
            writeln!(self.writer, "@comment{{{comment}}}")?;
        }

        let mut metadata: Vec<_> = db.metadata().iter().collect();
        metadata.sort_by_key(|(key, _)| key.as_str());
        for (key, value) in metadata {
            writeln!(self.writer)?;
            writeln!(
                self.writer,
                "@comment{{{META_COMMENT_PREFIX} {key}:{value}}}"
            )?;
        }

        let mut custom_types: Vec<_> = db.custom_types().values().collect();
        custom_types.sort_by_key(|ty| ty.name.as_str());
        for ty in custom_types {
            writeln!(self.writer)?;
            writeln!(self.writer, "@comment{{{}}}", ty.as_comment())?;
        }

        Ok(())
    }

    /// Write a single entry
    pub fn write_entry(&mut self, entry: &Entry<'_>) -> io::Result<()> {
        writeln!(self.writer, "@{}{{{},", entry.entry_type(), entry.key())?;

        let fields = entry.fields();
        for (i, field) in fields.iter().enumerate() {
            write!(self.writer, "{}{} = ", self.config.indent, field.name)?;
            self.write_value(&field.value)?;
            if i < fields.len() - 1 {
                writeln!(self.writer, ",")?;
            } else {
                writeln!(self.writer)?;
            }
        }

        writeln!(self.writer, "}}")?;
        Ok(())
    }

    /// Write a string definition
    fn write_string(&mut self, name: &str, value: &str) -> io::Result<()> {
        write!(self.writer, "@string{{{name} = ")?;
        self.write_value(value)?;
        writeln!(self.writer, "}}")?;
        Ok(())
    }

    /// Write a preamble
    fn write_preamble(&mut self, value: &str) -> io::Result<()> {
        writeln!(self.writer, "@preamble{{{value}}}")?;
        Ok(())
    }

    /// Write a field value, braced and wrapped, falling back to a quoted
    /// form when the text's own braces do not balance
    fn write_value(&mut self, value: &str) -> io::Result<()> {
        if braces_balance(value) {
            let wrapped = reformat::wrap(value, self.config.wrap_column);
            write!(self.writer, "{{{wrapped}}}")?;
        } else {
            // The quoted reader keeps backslashes (they are LaTeX escapes,
            // e.g. `K\"orper`), so a quote escaped here reads back as `\"`.
            // Values with both a quote and unbalanced braces therefore do
            // not round-trip byte for byte.
            write!(self.writer, "\"{}\"", value.replace('"', "\\\""))?;
        }
        Ok(())
    }
}

/// Check that every `{` has a matching `}` with no close before its open
fn braces_balance(s: &str) -> bool {
    let mut depth = 0i32;
    for b in s.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Convenience function to write a database to a string
pub fn to_string(db: &Database<'_>) -> Result<String> {
    let mut buf = Vec::new();
    let mut writer = Writer::new(&mut buf);
    writer.write_database(db)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Convenience function to write a database to a file
pub fn to_file(db: &Database<'_>, path: impl AsRef<std::path::Path>) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = Writer::new(file);
    writer.write_database(db)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryType;
    use std::borrow::Cow;

    fn render_entry(entry: &Entry<'_>) -> String {
        let mut buf = Vec::new();
        Writer::new(&mut buf).write_entry(entry).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_entry() {
        let mut entry = Entry::new(1, EntryType::Article, Cow::Borrowed("test2023"));
        entry.set_field("author", "John Doe");
        entry.set_field("title", "Test Article");
        entry.set_field("year", "2023");

        let result = render_entry(&entry);
        assert!(result.contains("@article{test2023,"));
        assert!(result.contains("author = {John Doe},"));
        assert!(result.contains("title = {Test Article},"));
        assert!(result.contains("year = {2023}\n"));
    }

    #[test]
    fn test_long_value_wraps_with_continuation() {
        let mut entry = Entry::new(1, EntryType::Misc, Cow::Borrowed("k"));
        entry.set_field(
            "note",
            "a rather long note that certainly extends past the wrap column somewhere toward its end",
        );
        let result = render_entry(&entry);
        assert!(result.contains("\n\t"));
    }

    #[test]
    fn test_unbalanced_braces_fall_back_to_quotes() {
        let mut entry = Entry::new(1, EntryType::Misc, Cow::Borrowed("k"));
        entry.set_field("note", "closes} early");
        let result = render_entry(&entry);
        assert!(result.contains("note = \"closes} early\""));
    }

    #[test]
    fn test_quoted_fallback_keeps_backslash_on_reparse() {
        let mut entry = Entry::new(1, EntryType::Misc, Cow::Borrowed("k"));
        entry.set_field("note", "a \"quote\" closes} early");
        let written = render_entry(&entry);
        assert!(written.contains("note = \"a \\\"quote\\\" closes} early\""));
        let reparsed = crate::parse(&written).unwrap();
        let note = reparsed.database.entries()[0].get("note").unwrap();
        assert_eq!(note, "a \\\"quote\\\" closes} early");
    }

    #[test]
    fn test_braces_balance() {
        assert!(braces_balance("plain"));
        assert!(braces_balance("{a {b} c}"));
        assert!(!braces_balance("}{"));
        assert!(!braces_balance("{open"));
    }

    #[test]
    fn test_strings_write_in_name_order() {
        let result = crate::parse("@string{zz = {Z}}\n@string{aa = {A}}").unwrap();
        let text = to_string(&result.database).unwrap();
        let a = text.find("@string{aa = {A}}").unwrap();
        let z = text.find("@string{zz = {Z}}").unwrap();
        assert!(a < z);
    }

    #[test]
    fn test_write_database_blocks() {
        let result = crate::parse(
            "@preamble{\\makeatletter}\n\
             @string{ap = {Annalen der Physik}}\n\
             @article{k, journal = ap}\n\
             @comment{free text}\n\
             @comment{jabref-meta: groups: a > b}\n\
             @comment{jabref-entrytype: lecture: req[author] opt[note]}",
        )
        .unwrap();
        let text = to_string(&result.database).unwrap();
        assert!(text.contains("@preamble{\\makeatletter}"));
        assert!(text.contains("@string{ap = {Annalen der Physik}}"));
        assert!(text.contains("@article{k,"));
        assert!(text.contains("journal = {Annalen der Physik}"));
        assert!(text.contains("@comment{free text}"));
        assert!(text.contains("@comment{jabref-meta: groups: a > b}"));
        assert!(text.contains("@comment{jabref-entrytype: lecture: req[author] opt[note]}"));
    }
}
