//! Line-oriented regex fallback parser (§4.B strategy 2, SPEC_FULL §B.1).
//!
//! Used when the compiled tree-sitter grammar bundle for a language is
//! unavailable. Produces the same `ParseProducts` shape as the AST backend —
//! fidelity differs, shape does not — and tags every symbol it emits with
//! `parser=regex` so retrieval and mutation can lower confidence in degraded
//! results.

use super::parser::{LanguageParser, ParseProducts, ParserBackend};
use crate::model::{CallReference, ImportReference};
use crate::types::{FileId, Language, Range, SymbolCounter, SymbolKind};
use crate::Symbol;
use regex::Regex;
use std::any::Any;
use std::sync::OnceLock;

pub struct RegexFallbackParser {
    language: Language,
}

impl RegexFallbackParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn definition_patterns(&self) -> &'static [(SymbolKind, Regex)] {
        static PY: OnceLock<Vec<(SymbolKind, Regex)>> = OnceLock::new();
        static TS_JS: OnceLock<Vec<(SymbolKind, Regex)>> = OnceLock::new();
        static GO: OnceLock<Vec<(SymbolKind, Regex)>> = OnceLock::new();

        match self.language {
            Language::Python => PY.get_or_init(|| {
                vec![
                    (SymbolKind::Class, Regex::new(r"^\s*class\s+(\w+)").unwrap()),
                    (
                        SymbolKind::Function,
                        Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\(").unwrap(),
                    ),
                ]
            }),
            Language::TypeScript | Language::JavaScript => TS_JS.get_or_init(|| {
                vec![
                    (SymbolKind::Class, Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?class\s+(\w+)").unwrap()),
                    (
                        SymbolKind::Interface,
                        Regex::new(r"^\s*(?:export\s+)?interface\s+(\w+)").unwrap(),
                    ),
                    (
                        SymbolKind::Function,
                        Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s+(\w+)\s*\(").unwrap(),
                    ),
                ]
            }),
            Language::Go => GO.get_or_init(|| {
                vec![
                    (
                        SymbolKind::Struct,
                        Regex::new(r"^\s*type\s+(\w+)\s+struct\b").unwrap(),
                    ),
                    (
                        SymbolKind::Function,
                        Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(").unwrap(),
                    ),
                ]
            }),
        }
    }

    fn import_pattern(&self) -> &'static Regex {
        static PY: OnceLock<Regex> = OnceLock::new();
        static TS_JS: OnceLock<Regex> = OnceLock::new();
        static GO: OnceLock<Regex> = OnceLock::new();

        match self.language {
            Language::Python => PY.get_or_init(|| {
                Regex::new(r"^\s*(?:from\s+(\S+)\s+import|import\s+(\S+))").unwrap()
            }),
            Language::TypeScript | Language::JavaScript => TS_JS.get_or_init(|| {
                Regex::new(r#"^\s*import\s+.*\s+from\s+['"]([^'"]+)['"]"#).unwrap()
            }),
            Language::Go => {
                GO.get_or_init(|| Regex::new(r#"^\s*"([^"]+)"\s*$"#).unwrap())
            }
        }
    }

    fn call_pattern() -> &'static Regex {
        static CALL: OnceLock<Regex> = OnceLock::new();
        CALL.get_or_init(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap())
    }
}

const DEFINITION_KEYWORDS: &[&str] = &["def", "class", "function", "func", "type", "interface", "export"];

impl LanguageParser for RegexFallbackParser {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &mut SymbolCounter) -> ParseProducts {
        let mut products = ParseProducts::default();
        let patterns = self.definition_patterns();
        let import_pattern = self.import_pattern();
        let call_pattern = Self::call_pattern();

        let mut open_symbol: Option<(SymbolKind, String, u32)> = None;

        for (idx, line) in code.lines().enumerate() {
            let line_no = crate::parsing::parser::line_1indexed(idx);

            if let Some((kind, name)) = patterns.iter().find_map(|(kind, re)| {
                re.captures(line).and_then(|c| c.get(1)).map(|m| (*kind, m.as_str().to_string()))
            }) {
                if let Some((prev_kind, prev_name, start)) = open_symbol.take() {
                    products.symbols.push(make_symbol(
                        counter, file_id, self.language, prev_kind, &prev_name, start, line_no.saturating_sub(1).max(start),
                    ));
                }
                open_symbol = Some((kind, name, line_no));
                continue;
            }

            if let Some(caps) = import_pattern.captures(line) {
                let module = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                if !module.is_empty() {
                    products.imports.push(ImportReference {
                        file_id,
                        module: module.into_boxed_str(),
                        line: line_no,
                    });
                }
            }

            let trimmed = line.trim_start();
            let starts_with_definition_kw = DEFINITION_KEYWORDS
                .iter()
                .any(|kw| trimmed.starts_with(kw) && trimmed.as_bytes().get(kw.len()).is_some_and(|b| *b == b' ' || *b == b'('));
            if !starts_with_definition_kw {
                for caps in call_pattern.captures_iter(line) {
                    let name = caps.get(1).unwrap().as_str();
                    if DEFINITION_KEYWORDS.contains(&name) {
                        continue;
                    }
                    products.calls.push(CallReference {
                        caller_file: file_id,
                        caller_symbol: None,
                        callee_name: name.into(),
                        line: line_no,
                    });
                }
            }
        }

        if let Some((kind, name, start)) = open_symbol {
            let end = crate::parsing::parser::line_1indexed(code.lines().count().saturating_sub(1));
            products.symbols.push(make_symbol(counter, file_id, self.language, kind, &name, start, end.max(start)));
        }

        products
    }

    fn language(&self) -> Language {
        self.language
    }

    fn backend(&self) -> ParserBackend {
        ParserBackend::Regex
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn make_symbol(
    counter: &mut SymbolCounter,
    file_id: FileId,
    language: Language,
    kind: SymbolKind,
    name: &str,
    start_line: u32,
    end_line: u32,
) -> Symbol {
    Symbol::new(
        counter.next_symbol_id(),
        name,
        kind,
        file_id,
        language,
        Range::new(start_line, 0, end_line, 0),
    )
    .mark_regex_fallback()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_fallback_tags_symbols() {
        let mut parser = RegexFallbackParser::new(Language::Python);
        let mut counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let products = parser.parse("def f():\n    return 1\n", file_id, &mut counter);
        assert_eq!(products.symbols.len(), 1);
        assert!(products.symbols[0].is_regex_fallback());
        assert_eq!(products.symbols[0].name.as_ref(), "f");
    }

    #[test]
    fn regex_fallback_extracts_python_imports() {
        let mut parser = RegexFallbackParser::new(Language::Python);
        let mut counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let products = parser.parse("import os\nfrom typing import List\n", file_id, &mut counter);
        assert_eq!(products.imports.len(), 2);
    }
}
