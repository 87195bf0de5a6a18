//! Escape-aware field splitting shared by every directive parser, and the
//! `\n`/`\,`/`\\` text-decode pass used by `~T` and `~V`.
//!
//! Splitting and decoding are kept as two separate passes — matching the
//! source, which treats `\,` as a non-splitting comma while tokenizing but
//! only unescapes `\n`/`\,`/`\\` inside the designated text field.

/// Split a directive's field string on commas, treating `\,` as a literal
/// comma that does not split the field (the escape is left in place for a
/// later [`decode_escapes`] pass on whichever field carries free text).
pub fn split_fields(s: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&',') {
            current.push('\\');
            current.push(',');
            chars.next();
        } else if c == ',' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

/// Decode `\n` -> LF, `\,` -> `,`, `\\` -> `\` in a free-text field. Any
/// other backslash sequence passes through unchanged.
pub fn decode_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    out.push('\n');
                    chars.next();
                }
                Some(',') => {
                    out.push(',');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Strip trailing whitespace, then pop a trailing print-status digit off
/// `fields` if the last field is exactly one ASCII digit. Returns the
/// print-status character, defaulting to `'1'` (always print) per §4.6.
pub fn pop_print_status(fields: &mut Vec<String>) -> char {
    if let Some(last) = fields.last() {
        let trimmed = last.trim_end();
        if trimmed.len() == 1 {
            if let Some(d) = trimmed.chars().next() {
                if d.is_ascii_digit() {
                    fields.pop();
                    return d;
                }
            }
        }
    }
    '1'
}

/// Strip trailing whitespace/newlines from a raw directive line body, the
/// way the source trims `p` before tokenizing.
pub fn trim_line(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n', ' ', '\t'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_unescaped_commas() {
        assert_eq!(split_fields("1,2,3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn escaped_comma_does_not_split() {
        assert_eq!(split_fields(r"a\,b,c"), vec![r"a\,b", "c"]);
    }

    #[test]
    fn decode_escapes_handles_all_three_sequences() {
        assert_eq!(decode_escapes(r"abc\,def\ngh\\i"), "abc,def\ngh\\i");
    }

    #[test]
    fn pop_print_status_extracts_trailing_digit() {
        let mut fields = vec!["a".to_string(), "b".to_string(), "4".to_string()];
        assert_eq!(pop_print_status(&mut fields), '4');
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn pop_print_status_defaults_when_last_field_not_a_digit() {
        let mut fields = vec!["a".to_string(), "W".to_string()];
        assert_eq!(pop_print_status(&mut fields), '1');
        assert_eq!(fields, vec!["a", "W"]);
    }
}
