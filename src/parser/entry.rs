//! Entry parsing
//!
//! Parses `@type{key, name = value, ...}` bodies. Field names are
//! lower-cased; the missing-key recovery of [`lexer::citation_key`] turns a
//! keyless entry's first token into its first field.

use super::lexer::KeyEnd;
use super::{cut, lexer, utils, value, PResult, Session};
use crate::model::{Entry, EntryType};
use std::borrow::Cow;
use winnow::prelude::*;
use winnow::token::one_of;

/// Parse an entry body; the input is positioned after the type name
pub(crate) fn parse_entry<'a>(
    input: &mut &'a str,
    session: &Session<'a, '_>,
    id: u64,
    ty: EntryType<'a>,
) -> PResult<Entry<'a>> {
    utils::ws(one_of(['{', '(']))
        .parse_next(input)
        .map_err(|_| cut("expected '{' or '(' after the entry type"))?;

    let (key, end) = lexer::citation_key(input)?;
    let mut entry = Entry::new(id, ty, key);

    if end == KeyEnd::FieldName {
        // The token read as a key is really the first field's name
        let name = entry.key().trim().to_lowercase();
        entry.key = Cow::Borrowed("");
        utils::ws('=')
            .parse_next(input)
            .map_err(|_| cut("expected '=' after field name"))?;
        let field_value = value::field_value(input, &name, session)?;
        entry.set_field(name, field_value);
    }

    loop {
        lexer::skip_whitespace(input);
        let Some(c) = input.chars().next() else {
            return Err(cut("unexpected end of input inside an entry"));
        };
        match c {
            '}' | ')' => {
                *input = &input[1..];
                break;
            }
            ',' => *input = &input[1..],
            _ => {
                let (name, field_value) = parse_field(input, session)?;
                entry.set_field(name, field_value);
            }
        }
    }
    Ok(entry)
}

/// Parse one `name = value` pair
fn parse_field<'a>(
    input: &mut &'a str,
    session: &Session<'a, '_>,
) -> PResult<(String, Cow<'a, str>)> {
    let name = lexer::bare_token(input)
        .map_err(|_| cut("expected a field name"))?
        .to_lowercase();
    utils::ws('=')
        .parse_next(input)
        .map_err(|_| cut(format!("expected '=' after field name '{name}'")))?;
    let field_value = value::field_value(input, &name, session)?;
    Ok((name, field_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ValueFormat;
    use ahash::AHashMap;

    fn parse(input: &'static str) -> Entry<'static> {
        let strings = AHashMap::new();
        let session = Session {
            strings: &strings,
            format: ValueFormat::Normalize,
        };
        let mut rest = input;
        parse_entry(&mut rest, &session, 1, EntryType::Article).unwrap()
    }

    #[test]
    fn test_simple_entry() {
        let entry = parse("{kn:2002,\n  author = {Knuth},\n  year = 2002,\n}");
        assert_eq!(entry.key(), "kn:2002");
        assert_eq!(entry.get("author"), Some("Knuth"));
        assert_eq!(entry.get("year"), Some("2002"));
    }

    #[test]
    fn test_field_names_lowercased() {
        let entry = parse("{k, AUTHOR = {Knuth}}");
        assert_eq!(entry.get("author"), Some("Knuth"));
        assert_eq!(entry.fields()[0].name, "author");
    }

    #[test]
    fn test_missing_trailing_comma_before_close() {
        let entry = parse("{k, author = {Knuth} }");
        assert_eq!(entry.get("author"), Some("Knuth"));
    }

    #[test]
    fn test_fieldless_entry_closes_right_after_the_key() {
        let entry = parse("{k}");
        assert_eq!(entry.key(), "k");
        assert!(entry.fields().is_empty());
    }

    #[test]
    fn test_missing_key_recovery() {
        let entry = parse("{ author = {Knuth}, year = 2002 }");
        assert_eq!(entry.key(), "");
        assert_eq!(entry.get("author"), Some("Knuth"));
        assert_eq!(entry.get("year"), Some("2002"));
    }

    #[test]
    fn test_author_fields_merge() {
        let entry = parse("{k, author = {A. Uthor}, author = {C. Oauthor}}");
        assert_eq!(entry.get("author"), Some("A. Uthor and C. Oauthor"));
    }

    #[test]
    fn test_empty_value_omits_field() {
        let entry = parse("{k, note = , year = 2002}");
        assert_eq!(entry.get("note"), None);
        assert_eq!(entry.get("year"), Some("2002"));
    }

    #[test]
    fn test_field_after_unterminated_key_is_fatal() {
        let strings = AHashMap::new();
        let session = Session {
            strings: &strings,
            format: ValueFormat::Normalize,
        };
        let mut rest = "{k author = {x}}";
        assert!(parse_entry(&mut rest, &session, 1, EntryType::Article).is_err());
    }

    #[test]
    fn test_unterminated_entry_is_fatal() {
        let strings = AHashMap::new();
        let session = Session {
            strings: &strings,
            format: ValueFormat::Normalize,
        };
        let mut rest = "{k, author = {x},";
        assert!(parse_entry(&mut rest, &session, 1, EntryType::Article).is_err());
    }
}
