//! Small shared combinators

use super::{lexer, SyntaxError};
use winnow::prelude::*;

/// Wrap a parser so it skips surrounding whitespace
pub(crate) fn ws<'a, F, O>(mut parser: F) -> impl Parser<&'a str, O, SyntaxError>
where
    F: Parser<&'a str, O, SyntaxError>,
{
    move |input: &mut &'a str| {
        lexer::skip_whitespace(input);
        let output = parser.parse_next(input)?;
        lexer::skip_whitespace(input);
        Ok(output)
    }
}
