//! BibTeX parser implementation
//!
//! The driver walks the input `@`-block by `@`-block, dispatching to the
//! entry parser and the special-block parsers, and collects everything into a
//! [`Database`](crate::Database) plus a list of warnings. All syntax errors
//! are fatal and carry the 1-based line number of the failure; recoverable
//! conditions (duplicate keys, duplicate string names, unresolved entry
//! types) are recorded as [`Warning`]s and parsing continues.

pub(crate) mod entry;
pub(crate) mod lexer;
pub(crate) mod utils;
pub(crate) mod value;

use crate::database::{Database, ParseResult, ValueFormat};
use crate::error::{Error, Result, Warning};
use crate::model::{
    CustomEntryType, Entry, EntryType, META_COMMENT_PREFIX, META_COMMENT_PREFIX_LEGACY,
};
use ahash::{AHashMap, AHashSet};
use std::borrow::Cow;
use winnow::error::{ErrMode, ErrorKind, ParserError};

/// Internal parser result type
pub(crate) type PResult<O> = winnow::PResult<O, SyntaxError>;

/// Syntax error raised inside token readers and block parsers
///
/// Carries only the message; the driver attaches line/column computed from
/// how far the input had been consumed when the error surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub(crate) message: Cow<'static, str>,
}

impl SyntaxError {
    pub(crate) fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<'a> ParserError<&'a str> for SyntaxError {
    fn from_error_kind(_input: &&'a str, _kind: ErrorKind) -> Self {
        Self::new("syntax error")
    }

    fn append(self, _input: &&'a str, _kind: ErrorKind) -> Self {
        self
    }
}

/// Build an unrecoverable error with a message
pub(crate) fn cut(message: impl Into<Cow<'static, str>>) -> ErrMode<SyntaxError> {
    ErrMode::Cut(SyntaxError::new(message))
}

/// Read-only context threaded into the sub-parsers
///
/// Sub-parsers never mutate shared tables; the driver owns all mutation.
pub(crate) struct Session<'a, 's> {
    /// String macros defined so far, for substitution at use
    pub(crate) strings: &'s AHashMap<Cow<'a, str>, Cow<'a, str>>,
    /// Whitespace policy for braced values
    pub(crate) format: ValueFormat,
}

/// One parsed `@...` block
enum Block<'a> {
    Entry(Entry<'a>),
    StringDef { name: &'a str, value: Cow<'a, str> },
    Preamble(String),
    Comment(&'a str),
}

/// Parse a complete BibTeX database
pub(crate) fn parse_database(input: &str, format: ValueFormat) -> Result<ParseResult<'_>> {
    let mut db = Database::new();
    let mut warnings = Vec::new();
    let mut seen_keys: AHashSet<String> = AHashSet::new();
    let mut next_id = 1u64;
    let mut remaining = input;

    loop {
        // Everything up to the next '@' is free text between blocks
        let Some(at) = memchr::memchr(b'@', remaining.as_bytes()) else {
            break;
        };
        remaining = &remaining[at + 1..];

        let session = Session {
            strings: db.strings(),
            format,
        };
        let block = match parse_block(&mut remaining, &session, next_id) {
            Ok(block) => block,
            Err(e) => return Err(located(input, remaining, &e)),
        };

        match block {
            Block::Entry(entry) => {
                if !entry.key().is_empty() && !seen_keys.insert(entry.key().to_string()) {
                    warnings.push(Warning::DuplicateKey(entry.key().to_string()));
                }
                db.add_entry(entry);
                next_id += 1;
            }
            Block::StringDef { name, value } => {
                if db.strings().contains_key(name) {
                    warnings.push(Warning::DuplicateString(name.to_string()));
                } else {
                    db.define_string(Cow::Borrowed(name), value);
                }
            }
            Block::Preamble(text) => db.add_preamble(Cow::Owned(text)),
            Block::Comment(body) => classify_comment(body, &mut db),
        }
    }

    warnings.extend(db.resolve_entry_types());
    Ok(ParseResult {
        database: db,
        warnings,
    })
}

/// Parse one block; the input is positioned right after the `@`
fn parse_block<'a>(
    input: &mut &'a str,
    session: &Session<'a, '_>,
    id: u64,
) -> PResult<Block<'a>> {
    lexer::skip_whitespace(input);
    let Ok(name) = lexer::bare_token(input) else {
        return Err(cut("expected an entry type name after '@'"));
    };

    if name.eq_ignore_ascii_case("comment") {
        parse_comment_body(input).map(Block::Comment)
    } else if name.eq_ignore_ascii_case("preamble") {
        parse_preamble_body(input).map(Block::Preamble)
    } else if name.eq_ignore_ascii_case("string") {
        let (name, value) = parse_string_body(input, session)?;
        Ok(Block::StringDef { name, value })
    } else {
        let ty = EntryType::parse(name);
        entry::parse_entry(input, session, id, ty).map(Block::Entry)
    }
}

/// Parse a `@comment` body, verbatim
fn parse_comment_body<'a>(input: &mut &'a str) -> PResult<&'a str> {
    lexer::skip_whitespace(input);
    if input.starts_with('{') {
        lexer::braced_exact(input)
    } else if let Some(rest) = input.strip_prefix('(') {
        let Some(close) = memchr::memchr(b')', rest.as_bytes()) else {
            return Err(cut("unterminated @comment block"));
        };
        let body = &rest[..close];
        *input = &rest[close + 1..];
        Ok(body)
    } else {
        Err(cut("expected '{' or '(' after @comment"))
    }
}

/// Parse a `@preamble` body, whitespace-normalized
///
/// Braces inside a preamble are LaTeX syntax, not nesting markers to strip,
/// so the body is read verbatim and only its whitespace is normalized.
fn parse_preamble_body(input: &mut &str) -> PResult<String> {
    lexer::skip_whitespace(input);
    if input.starts_with('{') {
        let body = lexer::braced_exact(input)?;
        Ok(lexer::normalize_whitespace(body))
    } else if let Some(rest) = input.strip_prefix('(') {
        let Some(close) = memchr::memchr(b')', rest.as_bytes()) else {
            return Err(cut("unterminated @preamble block"));
        };
        let body = lexer::normalize_whitespace(&rest[..close]);
        *input = &rest[close + 1..];
        Ok(body)
    } else {
        Err(cut("expected '{' or '(' after @preamble"))
    }
}

/// Parse a `@string{name = value}` definition
fn parse_string_body<'a>(
    input: &mut &'a str,
    session: &Session<'a, '_>,
) -> PResult<(&'a str, Cow<'a, str>)> {
    use winnow::prelude::*;
    use winnow::token::one_of;

    utils::ws(one_of(['{', '(']))
        .parse_next(input)
        .map_err(|_| cut("expected '{' or '(' after @string"))?;
    let name = lexer::bare_token(input).map_err(|_| cut("expected a string name"))?;
    utils::ws('=')
        .parse_next(input)
        .map_err(|_| cut("expected '=' in @string definition"))?;
    let value = value::field_value(input, name, session)?;
    utils::ws(one_of(['}', ')']))
        .parse_next(input)
        .map_err(|_| cut("unterminated @string definition"))?;
    Ok((name, value))
}

/// Route a comment body to the custom-type table, the metadata map, or the
/// plain comment list
fn classify_comment<'a>(body: &'a str, db: &mut Database<'a>) {
    if let Some(ty) = CustomEntryType::parse_comment(body) {
        db.define_custom_type(ty);
    } else if let Some((key, value)) = tagged_metadata(body) {
        db.set_metadata(key, value);
    } else {
        db.add_comment(Cow::Borrowed(body));
    }
}

/// Split a tagged metadata comment into key and newline-stripped value
fn tagged_metadata(body: &str) -> Option<(String, String)> {
    let body = body.trim_start();
    let rest = body
        .strip_prefix(META_COMMENT_PREFIX)
        .or_else(|| body.strip_prefix(META_COMMENT_PREFIX_LEGACY))?;
    let (key, value) = rest.split_once(':')?;
    Some((key.trim().to_string(), value.replace(['\n', '\r'], "")))
}

/// Attach line/column and a snippet to a syntax error
fn located(input: &str, remaining: &str, err: &ErrMode<SyntaxError>) -> Error {
    let consumed = input.len() - remaining.len();
    let (line, column) = position(input, consumed);
    let message = match err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.message.to_string(),
        ErrMode::Incomplete(_) => "incomplete input".to_string(),
    };
    Error::Parse {
        line,
        column,
        message,
        snippet: Some(snippet(remaining, 40)),
    }
}

/// Calculate 1-based line and column from a byte position
fn position(input: &str, pos: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in input.char_indices() {
        if i >= pos {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Get a snippet of input for error messages
fn snippet(input: &str, max_len: usize) -> String {
    let text: String = input.chars().take(max_len).collect();
    if input.chars().count() > max_len {
        format!("{text}...")
    } else {
        text
    }
}
