//! Field value parsing
//!
//! A value is a `#`-separated concatenation of quoted strings, braced
//! groups, numbers and string macro names. Concatenation here simply treats
//! `#` as a separator and appends every unit in order; a macro name that has
//! no definition yet survives as `#name#` so it can be spotted (and written
//! back) instead of silently vanishing.

use super::{cut, lexer, PResult, Session};
use crate::database::ValueFormat;
use crate::reformat;
use std::borrow::Cow;

/// Parse a field value and apply the configured whitespace policy
pub(crate) fn field_value<'a>(
    input: &mut &'a str,
    name: &str,
    session: &Session<'a, '_>,
) -> PResult<Cow<'a, str>> {
    let raw = field_content(input, session)?;
    if session.format == ValueFormat::Exact {
        return Ok(raw);
    }
    let formatted = reformat::unwrap(&raw, name);
    if formatted == raw {
        Ok(raw)
    } else {
        Ok(Cow::Owned(formatted))
    }
}

/// Parse the concatenation units of a value, up to the `,`, `}` or `)` that
/// ends it (left for the caller)
fn field_content<'a>(input: &mut &'a str, session: &Session<'a, '_>) -> PResult<Cow<'a, str>> {
    let mut value: Cow<'a, str> = Cow::Borrowed("");
    loop {
        lexer::skip_whitespace(input);
        let Some(c) = input.chars().next() else {
            return Err(cut("unexpected end of input in a field value"));
        };
        match c {
            ',' | '}' | ')' => break,
            '#' => *input = &input[1..],
            '"' => append(&mut value, Cow::Borrowed(lexer::quoted_string(input)?)),
            '{' => match session.format {
                ValueFormat::Exact => {
                    append(&mut value, Cow::Borrowed(lexer::braced_exact(input)?));
                }
                ValueFormat::Normalize => {
                    append(&mut value, Cow::Owned(lexer::braced_normalized(input)?));
                }
            },
            c if c.is_ascii_digit() => append(&mut value, Cow::Borrowed(lexer::bare_token(input)?)),
            _ => {
                let token = lexer::bare_token(input).map_err(|_| {
                    cut("empty text token; a comma between two fields may be missing")
                })?;
                match session.strings.get(token) {
                    Some(defined) => append(&mut value, defined.clone()),
                    None => append(&mut value, Cow::Owned(format!("#{token}#"))),
                }
            }
        }
    }
    Ok(value)
}

fn append<'a>(acc: &mut Cow<'a, str>, piece: Cow<'a, str>) {
    if acc.is_empty() {
        *acc = piece;
    } else {
        acc.to_mut().push_str(&piece);
    }
}
