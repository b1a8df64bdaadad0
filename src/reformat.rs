//! Field content reformatting
//!
//! A symmetric pair of transforms over field values. [`wrap`] breaks a value
//! into lines at a column width, marking each break with a newline-tab pair so
//! a later import can tell deliberate breaks from wrapping. [`unwrap`] undoes
//! that wrapping (including the marker written by pre-1.8 versions, which kept
//! a space after the tab), removes stray line breaks introduced by hand
//! editing, and collapses runs of spaces — except in the file-path field,
//! where consecutive spaces are part of the data.
//!
//! `unwrap` is idempotent: running it on its own output changes nothing.

use crate::model::FILE_FIELD;

/// Undo writer line-wrapping and normalize whitespace in a field value
///
/// `field` selects the space-collapsing policy: in [`FILE_FIELD`] runs of
/// spaces are preserved verbatim, everywhere else they collapse to one.
#[must_use]
pub fn unwrap(content: &str, field: &str) -> String {
    let preserve_spaces = field.eq_ignore_ascii_case(FILE_FIELD);
    // Drop carriage returns first so CRLF line endings read like LF
    let chars: Vec<char> = content.chars().filter(|&c| c != '\r').collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;
    let at = |k: usize| chars.get(k).copied();
    while i < chars.len() {
        match chars[i] {
            '\n' => {
                if at(i + 1) == Some('\t') && at(i + 2) == Some('\n') && at(i + 3) == Some('\t') {
                    // A wrapped blank line. Drop the wrap tabs, keep the
                    // newlines; every further newline-tab run is one more
                    // preserved break.
                    out.push_str("\n\n");
                    i += 4;
                    while at(i) == Some('\n') && at(i + 1) == Some('\t') {
                        out.push('\n');
                        i += 2;
                    }
                } else if at(i + 1) == Some('\t')
                    && at(i + 2).map_or(true, |c| !c.is_whitespace())
                {
                    // Ordinary wrap marker: delete it, re-join with a space
                    // unless either side already has whitespace.
                    i += 2;
                    if joins_words(&out, at(i)) {
                        out.push(' ');
                    }
                } else if at(i + 1) == Some('\t')
                    && at(i + 2) == Some(' ')
                    && at(i + 3).map_or(true, |c| !c.is_whitespace())
                {
                    // Wrap marker written by pre-1.8 versions, which kept the
                    // space. Delete the marker; the space is redundant only
                    // when whitespace precedes it.
                    i += 2;
                    if out.chars().last().is_some_and(char::is_whitespace) {
                        i += 1;
                    }
                } else if at(i + 1) != Some('\n') && !out.ends_with('\n') {
                    // A line break with no newline neighbor was introduced
                    // outside the writer (hand editing); remove it.
                    i += 1;
                    if joins_words(&out, at(i)) {
                        out.push(' ');
                    }
                } else {
                    out.push('\n');
                    i += 1;
                }
            }
            ' ' => {
                if !preserve_spaces && out.ends_with(' ') {
                    i += 1;
                } else {
                    out.push(' ');
                    i += 1;
                }
            }
            // Stray tabs never carry meaning outside a wrap marker
            '\t' => i += 1,
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// True when a deleted break sits between two non-whitespace characters and
/// needs a space to keep the words apart
fn joins_words(out: &str, next: Option<char>) -> bool {
    out.chars().last().is_some_and(|c| !c.is_whitespace())
        && next.is_some_and(|c| !c.is_whitespace())
}

/// Wrap a field value at `wrap_column`, marking breaks with newline-tab
///
/// Literal newlines in the input separate blocks that are wrapped
/// independently; blank lines contribute their break marker only.
#[must_use]
pub fn wrap(content: &str, wrap_column: usize) -> String {
    let mut out = String::with_capacity(content.len() + 16);
    for (i, line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\n\t");
        }
        if !line.trim().is_empty() {
            push_wrapped(&mut out, line, wrap_column);
        }
    }
    out
}

/// Append one line, replacing each space at or beyond the wrap column
/// (counted from the last break) with a newline-tab pair
fn push_wrapped(out: &mut String, line: &str, wrap_column: usize) {
    let mut since_break = 0usize;
    for c in line.chars() {
        if c == ' ' && since_break >= wrap_column {
            out.push_str("\n\t");
            since_break = 0;
        } else {
            out.push(c);
            since_break += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unwrap_joins_wrapped_lines() {
        assert_eq!(unwrap("a wrapped\n\tline", "note"), "a wrapped line");
        // No space doubling when one side already has whitespace
        assert_eq!(unwrap("a wrapped \n\tline", "note"), "a wrapped line");
    }

    #[test]
    fn test_unwrap_legacy_marker() {
        // Pre-1.8 writers kept a space after the marker
        assert_eq!(unwrap("a wrapped\n\t line", "note"), "a wrapped line");
        assert_eq!(unwrap("a wrapped \n\t line", "note"), "a wrapped line");
    }

    #[test]
    fn test_unwrap_preserves_wrapped_blank_lines() {
        assert_eq!(unwrap("one\n\t\n\ttwo", "note"), "one\n\ntwo");
        assert_eq!(unwrap("one\n\t\n\t\n\ttwo", "note"), "one\n\n\ntwo");
    }

    #[test]
    fn test_unwrap_removes_stray_newlines() {
        assert_eq!(unwrap("hand\nedited", "note"), "hand edited");
        assert_eq!(unwrap("trailing\n", "note"), "trailing");
    }

    #[test]
    fn test_unwrap_keeps_paragraph_breaks() {
        assert_eq!(unwrap("one\n\ntwo", "note"), "one\n\ntwo");
    }

    #[test]
    fn test_unwrap_collapses_spaces_except_in_file_field() {
        assert_eq!(unwrap("a  b", "note"), "a b");
        assert_eq!(unwrap("a  b", "file"), "a  b");
    }

    #[test]
    fn test_unwrap_strips_stray_tabs() {
        assert_eq!(unwrap("a\tb", "note"), "ab");
    }

    #[test]
    fn test_unwrap_handles_crlf_line_endings() {
        assert_eq!(unwrap("line1\r\nline2", "note"), "line1 line2");
        assert_eq!(unwrap("a wrapped\r\n\tline", "note"), "a wrapped line");
        assert_eq!(unwrap("one\r\n\r\ntwo", "note"), "one\n\ntwo");
    }

    #[test]
    fn test_wrap_breaks_at_column() {
        let s = "A very long sentence with many words repeated many times";
        let wrapped = wrap(s, 20);
        assert!(wrapped.contains("\n\t"));
        for line in wrapped.split("\n\t") {
            assert!(line.chars().count() <= 21 + 12);
        }
        assert_eq!(unwrap(&wrapped, "note"), s);
    }

    #[test]
    fn test_wrap_preserves_blank_lines() {
        assert_eq!(wrap("one\n\ntwo", 20), "one\n\t\n\ttwo");
        assert_eq!(unwrap(&wrap("one\n\ntwo", 20), "note"), "one\n\ntwo");
    }

    #[test]
    fn test_wrap_short_value_untouched() {
        assert_eq!(wrap("short", 65), "short");
    }

    proptest! {
        #[test]
        fn unwrap_is_idempotent(s in "[a-zA-Z .\\n]{0,80}") {
            let once = unwrap(&s, "note");
            prop_assert_eq!(unwrap(&once, "note"), once);
        }

        #[test]
        fn unwrap_is_idempotent_for_path_fields(s in "[a-zA-Z /.\\n]{0,80}") {
            let once = unwrap(&s, "file");
            prop_assert_eq!(unwrap(&once, "file"), once);
        }

        #[test]
        fn wrap_then_unwrap_restores_the_value(
            words in proptest::collection::vec("[a-zA-Z]{1,12}", 1..20),
            width in 10usize..60,
        ) {
            let s = words.join(" ");
            prop_assert_eq!(unwrap(&wrap(&s, width), "note"), s);
        }
    }
}
