//! Step 2 of the mutation pipeline (§4.H "Reformat"): detect the host file's
//! indentation and line endings, then rewrap replacement code to match.
//!
//! Grounded in `original_source/tests/test_mutation.py`'s `CodeFormatter`
//! expectations (tab vs. space detection, `_get_indent`/reindent-to-level)
//! and `CodeEditor`'s line-ending round trip, reworked as pure functions over
//! `&str` instead of a stateful formatter object.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// First line ending found wins; files with none (single line, or none yet)
/// default to LF.
pub fn detect_line_ending(source: &str) -> LineEnding {
    if source.contains("\r\n") {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}

pub fn normalize_line_endings(text: &str, ending: LineEnding) -> String {
    let unified = text.replace("\r\n", "\n");
    match ending {
        LineEnding::Lf => unified,
        LineEnding::CrLf => unified.replace('\n', "\r\n"),
    }
}

/// Leading whitespace run of one line.
pub fn leading_indent(line: &str) -> &str {
    let end = line.find(|c: char| c != ' ' && c != '\t').unwrap_or(line.len());
    &line[..end]
}

/// One indent unit, inferred from the first indented line in the file:
/// its literal leading whitespace (tabs and spaces are never mixed, per
/// the common convention this mirrors).
pub fn detect_indent_unit(source: &str) -> String {
    source
        .lines()
        .map(leading_indent)
        .find(|indent| !indent.is_empty())
        .unwrap_or("    ")
        .to_string()
}

/// Rewraps `code` so its shallowest line sits at `target_depth` indent units,
/// preserving the relative nesting of deeper lines. Blank lines are left bare.
pub fn reindent(code: &str, indent_unit: &str, target_depth: usize) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let base_depth = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_indent(l).len() / indent_unit.len().max(1))
        .min()
        .unwrap_or(0);

    lines
        .into_iter()
        .map(|line| {
            if line.trim().is_empty() {
                return String::new();
            }
            let current_depth = leading_indent(line).len() / indent_unit.len().max(1);
            let relative = current_depth.saturating_sub(base_depth);
            let new_depth = target_depth + relative;
            format!("{}{}", indent_unit.repeat(new_depth), line.trim_start())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_four_space_indent() {
        let source = "def foo():\n    pass\n    return 1\n";
        assert_eq!(detect_indent_unit(source), "    ");
    }

    #[test]
    fn detects_tab_indent() {
        let source = "def foo():\n\tpass\n\treturn 1\n";
        assert_eq!(detect_indent_unit(source), "\t");
    }

    #[test]
    fn reindents_to_target_depth() {
        let code = "def foo():\n    pass";
        let reindented = reindent(code, "    ", 1);
        let lines: Vec<&str> = reindented.split('\n').collect();
        assert!(lines[0].starts_with("    def foo():"));
        assert!(lines[1].starts_with("        pass"));
    }

    #[test]
    fn crlf_round_trips() {
        let source = "line1\r\nline2\r\nline3";
        assert_eq!(detect_line_ending(source), LineEnding::CrLf);
        let normalized = normalize_line_endings("line1\nline2", LineEnding::CrLf);
        assert_eq!(normalized, "line1\r\nline2");
    }

    #[test]
    fn lf_is_the_default() {
        let source = "line1\nline2\nline3";
        assert_eq!(detect_line_ending(source), LineEnding::Lf);
        let normalized = normalize_line_endings(source, LineEnding::Lf);
        assert!(!normalized.contains('\r'));
    }
}
