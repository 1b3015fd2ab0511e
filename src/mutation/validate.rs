//! Step 3's syntax gate (§4.H "Splice... validate syntax for the file's
//! language"). Grounded in `original_source/tests/test_mutation.py`'s
//! `CodeValidator.validate_syntax`, which parses the candidate text and
//! reports parse errors rather than re-implementing a language grammar —
//! here done with the same tree-sitter grammars the AST parsers already
//! depend on, checking for `ERROR`/missing nodes in the parsed tree.

use crate::types::Language;
use tree_sitter::Parser;

/// Parses `code` with the grammar for `language` and reports whether the
/// resulting tree contains any error or missing nodes. Returns `Ok(Vec<..>)`
/// of human-readable error descriptions; empty means valid.
pub fn validate_syntax(code: &str, language: Language) -> Result<Vec<String>, String> {
    let mut parser = Parser::new();
    let ts_language: tree_sitter::Language = match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    };
    parser.set_language(&ts_language).map_err(|e| format!("failed to load {} grammar: {e}", language.tag()))?;

    let tree = parser.parse(code, None).ok_or_else(|| "parser produced no tree".to_string())?;
    let mut errors = Vec::new();
    collect_errors(tree.root_node(), &mut errors);
    Ok(errors)
}

fn collect_errors(node: tree_sitter::Node, errors: &mut Vec<String>) {
    if node.is_error() || node.is_missing() {
        let start = node.start_position();
        errors.push(format!("syntax error near line {}, column {}", start.row + 1, start.column));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_python_has_no_errors() {
        let errors = validate_syntax("def foo():\n    return 42\n", Language::Python).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn invalid_python_is_flagged() {
        let errors = validate_syntax("def foo(\n    return 42\n", Language::Python).unwrap();
        assert!(!errors.is_empty());
    }

    #[test]
    fn valid_go_has_no_errors() {
        let errors = validate_syntax("package main\n\nfunc main() {}\n", Language::Go).unwrap();
        assert!(errors.is_empty());
    }
}
