//! Step 3 of the mutation pipeline (§4.H "Splice"): replace or remove a
//! symbol's line span in the full file text, in memory, ahead of validation.

use crate::types::Range;

/// Replaces the 1-indexed inclusive line range `range.start_line..=range.end_line`
/// in `source` with `replacement`, returning the new whole-file text.
pub fn splice_replace(source: &str, range: Range, replacement: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = (range.start_line as usize).saturating_sub(1).min(lines.len());
    let end = (range.end_line as usize).min(lines.len());

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start]);
    let replacement_lines: Vec<&str> = replacement.lines().collect();
    out.extend_from_slice(&replacement_lines);
    if end < lines.len() {
        out.extend_from_slice(&lines[end..]);
    }
    out.join("\n")
}

/// Removes the symbol's line span entirely, plus one trailing blank line if
/// the line immediately after the span is blank (§4.H "Delete operation").
pub fn splice_delete(source: &str, range: Range) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = (range.start_line as usize).saturating_sub(1).min(lines.len());
    let mut end = (range.end_line as usize).min(lines.len());
    if lines.get(end).is_some_and(|l| l.trim().is_empty()) {
        end += 1;
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start]);
    if end < lines.len() {
        out.extend_from_slice(&lines[end..]);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_only_the_span() {
        let source = "def first():\n    return 1\n\ndef second():\n    return 2\n\ndef third():\n    return 3";
        let range = Range::new(4, 0, 5, 13);
        let replacement = "def second():\n    return 222";
        let spliced = splice_replace(source, range, replacement);
        assert!(spliced.contains("def first():"));
        assert!(spliced.contains("return 222"));
        assert!(spliced.contains("def third():"));
        assert!(!spliced.contains("return 2\n"));
    }

    #[test]
    fn delete_drops_span_and_trailing_blank_line() {
        let source = "def to_delete():\n    return 1\n\ndef keep_this():\n    return 2";
        let range = Range::new(1, 0, 2, 13);
        let spliced = splice_delete(source, range);
        assert!(!spliced.contains("to_delete"));
        assert!(spliced.contains("keep_this"));
        assert!(spliced.starts_with("def keep_this"));
    }
}
