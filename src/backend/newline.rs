/// Stand-in for an embedded line break inside a single table cell.
///
/// Spreadsheet ingestion flattens every row onto one tab-delimited line, so
/// multi-line cells are written with this character instead of `\n`. The row
/// normalizer turns it back into `\n`.
pub const NEWLINE_PLACEHOLDER: char = '⏎';

/// Replace `\r\n`, `\n` and `\r` with [`NEWLINE_PLACEHOLDER`].
pub fn escape_newlines(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(NEWLINE_PLACEHOLDER);
            }
            '\n' => out.push(NEWLINE_PLACEHOLDER),
            _ => out.push(c),
        }
    }
    out
}

/// Replace every [`NEWLINE_PLACEHOLDER`] with `\n`.
pub fn restore_newlines(value: &str) -> String {
    value.replace(NEWLINE_PLACEHOLDER, "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_line_endings() {
        assert_eq!(escape_newlines("a\r\nb\nc\rd"), "a⏎b⏎c⏎d");
    }

    #[test]
    fn test_round_trip_preserves_text() {
        let original = "본문 내용\n두 번째 줄\n\n세 번째";
        assert_eq!(restore_newlines(&escape_newlines(original)), original);
    }

    #[test]
    fn test_restore_without_placeholder_is_identity() {
        assert_eq!(restore_newlines("plain text"), "plain text");
    }
}
