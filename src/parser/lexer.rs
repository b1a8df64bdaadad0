//! Lexical token readers
//!
//! Four readers cover every token the grammar needs: bare tokens for type
//! names, field names, numbers and macro names; citation keys with their
//! missing-key recovery; braced groups in normalizing and exact flavors; and
//! quoted strings. The braced and quoted readers scan with `memchr` where
//! they can.

use super::{cut, PResult, SyntaxError};
use std::borrow::Cow;
use winnow::error::ErrMode;
use winnow::prelude::*;
use winnow::token::take_while;

/// Characters allowed in bare tokens: alphanumerics plus a handful of
/// punctuation that shows up in field names and string macro names
fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '*' | '+' | '.' | '/' | '\'')
}

/// Characters that may never appear in a citation key
fn is_forbidden_key_char(c: char) -> bool {
    matches!(c, '#' | '{' | '~' | '\u{FFFD}' | '\u{FFFF}')
}

/// A key character is anything that is not whitespace, not a key terminator
/// (`,`, `=`, `}`) and not forbidden outright
fn is_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '=' | '}') && !is_forbidden_key_char(c)
}

/// Read a non-empty run of token characters
pub(crate) fn bare_token<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., is_token_char).parse_next(input)
}

/// Skip leading whitespace, Unicode-aware
pub(crate) fn skip_whitespace(input: &mut &str) {
    *input = input.trim_start();
}

/// Why the citation key reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyEnd {
    /// The key is complete; the field list or closing delimiter follows
    Complete,
    /// The entry has no key: the token that was read is really the first
    /// field's name, and the input is positioned at its `=`
    FieldName,
}

/// How to treat a `=` encountered while reading a key
enum Equals {
    FieldName,
    PartOfKey,
}

/// A `=` right after the token usually means the entry skipped its key and
/// the token is a field name, unless the character after the `=` could not
/// start a field value, in which case the `=` belongs to the key itself.
fn equals_disposition(input: &str) -> Equals {
    match input[1..].chars().next() {
        None | Some('{') | Some('"') => Equals::FieldName,
        Some(c) if c.is_whitespace() => Equals::FieldName,
        Some(_) => Equals::PartOfKey,
    }
}

/// Read a citation key
///
/// The key ends at `,` (consumed) or, tolerating a missing trailing comma,
/// at `}` — immediate or after whitespace — or at whitespace followed by
/// `)` or end of input (all left for the caller). Whitespace followed by
/// anything else is an error. Forbidden characters abort the parse.
pub(crate) fn citation_key<'a>(input: &mut &'a str) -> PResult<(Cow<'a, str>, KeyEnd)> {
    skip_whitespace(input);
    let mut key: Cow<'a, str> = Cow::Borrowed("");
    loop {
        let run = input.find(|c: char| !is_key_char(c)).unwrap_or(input.len());
        push_part(&mut key, &input[..run]);
        *input = &input[run..];

        let Some(c) = input.chars().next() else {
            return Ok((key, KeyEnd::Complete));
        };
        match c {
            ',' => {
                *input = &input[1..];
                return Ok((key, KeyEnd::Complete));
            }
            '}' => return Ok((key, KeyEnd::Complete)),
            '=' => match equals_disposition(input) {
                Equals::FieldName => return Ok((key, KeyEnd::FieldName)),
                Equals::PartOfKey => {
                    push_part(&mut key, "=");
                    *input = &input[1..];
                }
            },
            c if c.is_whitespace() => {
                skip_whitespace(input);
                match input.chars().next() {
                    Some(',') => {
                        *input = &input[1..];
                        return Ok((key, KeyEnd::Complete));
                    }
                    Some('}' | ')') | None => return Ok((key, KeyEnd::Complete)),
                    Some('=') => match equals_disposition(input) {
                        Equals::FieldName => return Ok((key, KeyEnd::FieldName)),
                        Equals::PartOfKey => {
                            push_part(&mut key, "=");
                            *input = &input[1..];
                        }
                    },
                    Some(_) => {
                        return Err(cut(
                            "expected ',' after the citation key; a comma may be missing",
                        ))
                    }
                }
            }
            c => return Err(cut(format!("character '{c}' is not allowed in citation keys"))),
        }
    }
}

fn push_part<'a>(key: &mut Cow<'a, str>, part: &'a str) {
    if part.is_empty() {
        return;
    }
    if key.is_empty() {
        *key = Cow::Borrowed(part);
    } else {
        key.to_mut().push_str(part);
    }
}

/// Read a braced group, normalizing whitespace
///
/// The outer braces are consumed; inner braces only adjust nesting depth and
/// are not echoed into the output. Whitespace runs lose their spaces: a run
/// of nothing but spaces becomes one space, and an exact `\n\t` (a wrapping
/// writer's continuation) becomes one space too, while any other newlines in
/// a run are kept with tabs stripped. Blank-line markers (`\n\t\n\t`) thus
/// come out as `\n\n` for the field reformatter to recognize.
pub(crate) fn braced_normalized(input: &mut &str) -> PResult<String> {
    let Some(s) = input.strip_prefix('{') else {
        return Err(ErrMode::Backtrack(SyntaxError::new("expected '{'")));
    };
    let mut out = String::with_capacity(s.len().min(64));
    let mut depth = 0usize;
    let mut iter = s.chars().peekable();
    let mut consumed = 1usize;
    while let Some(c) = iter.next() {
        consumed += c.len_utf8();
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => {
                *input = &input[consumed..];
                return Ok(out);
            }
            '}' => depth -= 1,
            c if c.is_whitespace() => {
                let mut run = String::new();
                if c != ' ' {
                    run.push(c);
                }
                while let Some(&c2) = iter.peek() {
                    if !c2.is_whitespace() {
                        break;
                    }
                    consumed += c2.len_utf8();
                    if c2 != ' ' {
                        run.push(c2);
                    }
                    iter.next();
                }
                push_whitespace_run(&mut out, &run);
            }
            c => out.push(c),
        }
    }
    Err(cut("unterminated brace group"))
}

/// Normalize the whitespace of plain text the way [`braced_normalized`] does,
/// without any brace handling
pub(crate) fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut iter = s.chars().peekable();
    while let Some(c) = iter.next() {
        if c.is_whitespace() {
            let mut run = String::new();
            if c != ' ' {
                run.push(c);
            }
            while let Some(&c2) = iter.peek() {
                if !c2.is_whitespace() {
                    break;
                }
                if c2 != ' ' {
                    run.push(c2);
                }
                iter.next();
            }
            push_whitespace_run(&mut out, &run);
        } else {
            out.push(c);
        }
    }
    out
}

/// Append a whitespace run, reduced to its spaces-removed form
///
/// Carriage returns never carry meaning and are dropped up front, so CRLF
/// input behaves exactly like LF input.
fn push_whitespace_run(out: &mut String, run: &str) {
    let run: String = run.chars().filter(|&c| c != '\r').collect();
    if run.is_empty() || run == "\n\t" {
        out.push(' ');
    } else {
        out.extend(run.chars().filter(|&c| c != '\t'));
    }
}

/// Read a braced group verbatim, returning the inner text as-is
pub(crate) fn braced_exact<'a>(input: &mut &'a str) -> PResult<&'a str> {
    let Some(s) = input.strip_prefix('{') else {
        return Err(ErrMode::Backtrack(SyntaxError::new("expected '{'")));
    };
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0usize;
    while let Some(off) = memchr::memchr2(b'{', b'}', &bytes[pos..]) {
        let p = pos + off;
        if bytes[p] == b'{' {
            depth += 1;
        } else if depth == 0 {
            *input = &s[p + 1..];
            return Ok(&s[..p]);
        } else {
            depth -= 1;
        }
        pos = p + 1;
    }
    Err(cut("unterminated brace group"))
}

/// Read a quoted string verbatim; `\"` stays in the text and does not end it
pub(crate) fn quoted_string<'a>(input: &mut &'a str) -> PResult<&'a str> {
    let Some(s) = input.strip_prefix('"') else {
        return Err(ErrMode::Backtrack(SyntaxError::new("expected '\"'")));
    };
    let bytes = s.as_bytes();
    let mut pos = 0usize;
    while let Some(off) = memchr::memchr(b'"', &bytes[pos..]) {
        let p = pos + off;
        if p > 0 && bytes[p - 1] == b'\\' {
            pos = p + 1;
            continue;
        }
        *input = &s[p + 1..];
        return Ok(&s[..p]);
    }
    Err(cut("unterminated quoted string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(input: &str) -> (String, KeyEnd, &str) {
        let mut rest = input;
        let (k, end) = citation_key(&mut rest).unwrap();
        (k.into_owned(), end, rest)
    }

    #[test]
    fn test_bare_token() {
        let mut input = "article{key";
        assert_eq!(bare_token(&mut input).unwrap(), "article");
        assert_eq!(input, "{key");

        let mut input = "kn:gnus-2002,";
        assert_eq!(bare_token(&mut input).unwrap(), "kn:gnus-2002");

        let mut input = "{no token";
        assert!(bare_token(&mut input).is_err());
    }

    #[test]
    fn test_citation_key_plain() {
        let (k, end, rest) = key("smith2020, author");
        assert_eq!(k, "smith2020");
        assert_eq!(end, KeyEnd::Complete);
        assert_eq!(rest, " author");
    }

    #[test]
    fn test_citation_key_missing_trailing_comma() {
        let (k, end, rest) = key("smith2020 }");
        assert_eq!(k, "smith2020");
        assert_eq!(end, KeyEnd::Complete);
        assert_eq!(rest, "}");

        let (k, end, _) = key("smith2020");
        assert_eq!(k, "smith2020");
        assert_eq!(end, KeyEnd::Complete);
    }

    #[test]
    fn test_citation_key_immediate_closer() {
        let (k, end, rest) = key("smith2020}");
        assert_eq!(k, "smith2020");
        assert_eq!(end, KeyEnd::Complete);
        assert_eq!(rest, "}");
    }

    #[test]
    fn test_citation_key_whitespace_then_garbage_fails() {
        let mut input = "smith 2020,";
        assert!(citation_key(&mut input).is_err());
    }

    #[test]
    fn test_citation_key_forbidden_chars() {
        for input in ["a#b,", "a{b,", "a~b,"] {
            let mut rest = input;
            assert!(citation_key(&mut rest).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_citation_key_missing_key_recovery() {
        // No key: the token is the first field name
        let (k, end, rest) = key("author = {x},");
        assert_eq!(k, "author");
        assert_eq!(end, KeyEnd::FieldName);
        assert_eq!(rest, "= {x},");
    }

    #[test]
    fn test_citation_key_equals_joins_key() {
        // '=' followed by a value-like char cannot be a field assignment
        let (k, end, _) = key("a=b,");
        assert_eq!(k, "a=b");
        assert_eq!(end, KeyEnd::Complete);
    }

    #[test]
    fn test_braced_normalized_collapses_spaces_keeps_newlines() {
        let mut input = "{a  b\n   c}rest";
        assert_eq!(braced_normalized(&mut input).unwrap(), "a b\nc");
        assert_eq!(input, "rest");
    }

    #[test]
    fn test_braced_normalized_drops_inner_braces() {
        let mut input = "{a {b} c},";
        assert_eq!(braced_normalized(&mut input).unwrap(), "a b c");
    }

    #[test]
    fn test_braced_normalized_undoes_wrap_marker() {
        let mut input = "{first\n\tsecond}";
        assert_eq!(braced_normalized(&mut input).unwrap(), "first second");
    }

    #[test]
    fn test_braced_normalized_keeps_blank_line_marker() {
        let mut input = "{a\n\t\n\tb}";
        assert_eq!(braced_normalized(&mut input).unwrap(), "a\n\nb");
    }

    #[test]
    fn test_braced_normalized_drops_carriage_returns() {
        let mut input = "{line1\r\nline2}";
        assert_eq!(braced_normalized(&mut input).unwrap(), "line1\nline2");

        // A CRLF wrap marker is still a wrap marker
        let mut input = "{first\r\n\tsecond}";
        assert_eq!(braced_normalized(&mut input).unwrap(), "first second");
    }

    #[test]
    fn test_braced_normalized_unterminated() {
        let mut input = "{never closed";
        assert!(braced_normalized(&mut input).is_err());
    }

    #[test]
    fn test_braced_exact_verbatim() {
        let mut input = "{a  {b}\n c},";
        assert_eq!(braced_exact(&mut input).unwrap(), "a  {b}\n c");
        assert_eq!(input, ",");
    }

    #[test]
    fn test_quoted_string() {
        let mut input = "\"hello world\",";
        assert_eq!(quoted_string(&mut input).unwrap(), "hello world");
        assert_eq!(input, ",");
    }

    #[test]
    fn test_quoted_string_escaped_quote() {
        let mut input = r#""say \"hi\"","#;
        assert_eq!(quoted_string(&mut input).unwrap(), r#"say \"hi\""#);
        assert_eq!(input, ",");
    }

    #[test]
    fn test_quoted_string_unterminated() {
        let mut input = "\"never closed";
        assert!(quoted_string(&mut input).is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a  b"), "a b");
        assert_eq!(normalize_whitespace("a \n b"), "a\nb");
        assert_eq!(normalize_whitespace("a\n\tb"), "a b");
    }
}
