//! Span reads (§4.G "Span reads"): pull a Symbol's source lines out of the
//! file it lives in, with optional padding or skeleton (signature-only)
//! rendering.

use crate::types::Range;

#[derive(Debug, Clone)]
pub struct Snippet {
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

/// 1-indexed `[start_line, end_line]` read of `source`, padded by `pad` lines
/// on either side and clamped to the file's bounds (§4.G).
pub fn read_span(source: &str, range: Range, pad: u32) -> Snippet {
    let lines: Vec<&str> = source.lines().collect();
    let last_line = lines.len() as u32;

    let start_line = range.start_line.saturating_sub(pad).max(1);
    let end_line = (range.end_line + pad).min(last_line.max(1));

    let text = slice_lines(&lines, start_line, end_line);
    Snippet { start_line, end_line, text }
}

/// Drops statement bodies, keeping only the symbol's signature line(s) and
/// any leading docstring/doc-comment lines directly above it (§4.G "skeleton
/// mode"). `doc_summary` is rendered back in verbatim since the parser only
/// retained its first line, not the full comment block.
pub fn read_skeleton(source: &str, range: Range, signature: Option<&str>, doc_summary: Option<&str>) -> Snippet {
    let lines: Vec<&str> = source.lines().collect();
    let mut text = String::new();
    if let Some(doc) = doc_summary {
        text.push_str(doc);
        text.push('\n');
    }
    match signature {
        Some(sig) => text.push_str(sig),
        None => {
            if let Some(first) = lines.get((range.start_line.saturating_sub(1)) as usize) {
                text.push_str(first.trim_end());
            }
        }
    }
    Snippet {
        start_line: range.start_line,
        end_line: range.start_line,
        text,
    }
}

fn slice_lines(lines: &[&str], start_line: u32, end_line: u32) -> String {
    if start_line == 0 || start_line > end_line || lines.is_empty() {
        return String::new();
    }
    let start_idx = (start_line - 1) as usize;
    let end_idx = (end_line as usize).min(lines.len());
    if start_idx >= end_idx {
        return String::new();
    }
    lines[start_idx..end_idx].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "line1\nline2\nline3\nline4\nline5\n";

    #[test]
    fn reads_exact_span_with_no_padding() {
        let range = Range::new(2, 0, 3, 0);
        let snippet = read_span(SOURCE, range, 0);
        assert_eq!(snippet.text, "line2\nline3");
    }

    #[test]
    fn padding_is_clamped_to_file_bounds() {
        let range = Range::new(1, 0, 1, 0);
        let snippet = read_span(SOURCE, range, 5);
        assert_eq!(snippet.start_line, 1);
        assert!(snippet.text.starts_with("line1"));
    }

    #[test]
    fn skeleton_keeps_signature_and_doc_only() {
        let range = Range::new(2, 0, 4, 0);
        let snippet = read_skeleton(SOURCE, range, Some("def f():"), Some("Does a thing."));
        assert_eq!(snippet.text, "Does a thing.\ndef f():");
    }
}
