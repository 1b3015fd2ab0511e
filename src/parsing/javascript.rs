//! Tree-sitter-backed JavaScript/JSX parser (§4.B AST backend).
//!
//! JavaScript and TypeScript share most syntax; this parser omits the
//! TypeScript-only constructs (interfaces, type aliases, explicit type
//! annotations) that `typescript.rs` adds on top of the same traversal shape.

use super::parser::{
    check_recursion_depth, line_1indexed, HandledNode, LanguageParser, NodeTracker,
    NodeTrackingState, ParseProducts, ParserBackend,
};
use crate::model::{CallReference, ImportLink, ImportReference, MethodCall, TypeInfo, TypeInfoSource};
use crate::types::{FileId, Language, Range, SymbolCounter, SymbolId, SymbolKind};
use crate::Symbol;
use std::any::Any;
use tree_sitter::{Node, Parser};

pub struct JavaScriptParser {
    parser: Parser,
    node_tracker: NodeTrackingState,
    language_tag: Language,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| format!("failed to set JavaScript grammar: {e}"))?;
        Ok(Self {
            parser,
            node_tracker: NodeTrackingState::new(),
            language_tag: Language::JavaScript,
        })
    }

    fn register(&mut self, node: Node) {
        self.node_tracker
            .register_handled_node(node.kind(), node.kind_id());
    }

    fn walk(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &mut SymbolCounter,
        products: &mut ParseProducts,
        enclosing: Option<SymbolId>,
        depth: usize,
    ) {
        if !check_recursion_depth(depth, node) {
            return;
        }

        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                self.register(node);
                if let Some(symbol) = self.process_function(node, code, file_id, counter, SymbolKind::Function) {
                    let id = symbol.id;
                    products.symbols.push(symbol);
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk(body, code, file_id, counter, products, Some(id), depth + 1);
                    }
                    return;
                }
            }
            "class_declaration" => {
                self.register(node);
                if let Some(symbol) = self.process_class(node, code, file_id, counter) {
                    let id = symbol.id;
                    products.symbols.push(symbol);
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk(body, code, file_id, counter, products, Some(id), depth + 1);
                    }
                    return;
                }
            }
            "method_definition" => {
                self.register(node);
                if let Some(symbol) = self.process_function(node, code, file_id, counter, SymbolKind::Method) {
                    let id = symbol.id;
                    products.symbols.push(symbol);
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk(body, code, file_id, counter, products, Some(id), depth + 1);
                    }
                    return;
                }
            }
            "import_statement" => {
                self.process_import(node, code, file_id, products);
            }
            "call_expression" => {
                self.process_call(node, code, file_id, enclosing, products);
            }
            "variable_declarator" => {
                self.process_declarator(node, code, file_id, enclosing, products);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, code, file_id, counter, products, enclosing, depth + 1);
        }
    }

    fn process_function(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &mut SymbolCounter,
        kind: SymbolKind,
    ) -> Option<Symbol> {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))?;
        let name = text(code, name_node);
        let range = node_range(node);
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| collect_identifier_params(p, code))
            .unwrap_or_default();
        let signature = node
            .child_by_field_name("parameters")
            .map(|p| format!("function {name}{}", text(code, p)));

        let mut symbol = Symbol::new(counter.next_symbol_id(), name, kind, file_id, self.language_tag, range);
        if let Some(sig) = signature {
            symbol = symbol.with_signature(sig);
        }
        symbol = symbol.with_parameters(parameters);
        Some(symbol)
    }

    fn process_class(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &mut SymbolCounter,
    ) -> Option<Symbol> {
        let name_node = node.child_by_field_name("name")?;
        let name = text(code, name_node);
        let range = node_range(node);

        let bases = node
            .child_by_field_name("heritage")
            .into_iter()
            .flat_map(|h| {
                let mut cursor = h.walk();
                h.children(&mut cursor)
                    .filter(|c| c.kind() == "identifier" || c.kind() == "member_expression")
                    .map(|c| text(code, c).into_boxed_str())
                    .collect::<Vec<_>>()
            })
            .collect();

        let symbol = Symbol::new(counter.next_symbol_id(), name, SymbolKind::Class, file_id, self.language_tag, range)
            .with_bases(bases);
        Some(symbol)
    }

    fn process_import(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        products: &mut ParseProducts,
    ) {
        let line = line_1indexed(node.start_position().row);
        let Some(source) = node.child_by_field_name("source") else { return };
        let module = text(code, source).trim_matches(|c| c == '"' || c == '\'').to_string();
        products.imports.push(ImportReference { file_id, module: module.clone().into_boxed_str(), line });

        let mut imported_symbols = Vec::new();
        let mut alias = None;
        let mut is_glob = false;

        if let Some(clause) = node.child_by_field_name("import_clause") {
            let mut cursor = clause.walk();
            for part in clause.children(&mut cursor) {
                match part.kind() {
                    "identifier" => alias = Some(text(code, part)),
                    "namespace_import" => is_glob = true,
                    "named_imports" => {
                        let mut inner = part.walk();
                        for spec in part.children(&mut inner) {
                            if spec.kind() == "import_specifier" {
                                if let Some(n) = spec.child_by_field_name("name") {
                                    imported_symbols.push(text(code, n).into_boxed_str());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        products.import_links.push(ImportLink {
            file_id,
            module: module.into_boxed_str(),
            imported_symbols,
            alias: alias.map(|a| a.into_boxed_str()),
            is_glob,
            line,
            definition_file: None,
            definition_symbol: None,
        });
    }

    fn process_call(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        enclosing: Option<SymbolId>,
        products: &mut ParseProducts,
    ) {
        let Some(function) = node.child_by_field_name("function") else { return };
        let line = line_1indexed(node.start_position().row);

        match function.kind() {
            "identifier" => {
                products.calls.push(CallReference {
                    caller_file: file_id,
                    caller_symbol: enclosing,
                    callee_name: text(code, function).into_boxed_str(),
                    line,
                });
            }
            "member_expression" => {
                let Some(object) = function.child_by_field_name("object") else { return };
                let Some(property) = function.child_by_field_name("property") else { return };
                products.method_calls.push(MethodCall {
                    caller_file: file_id,
                    caller_symbol: enclosing,
                    receiver_expression: text(code, object).into_boxed_str(),
                    method_name: text(code, property).into_boxed_str(),
                    line,
                });
            }
            _ => {}
        }
    }

    fn process_declarator(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        enclosing: Option<SymbolId>,
        products: &mut ParseProducts,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        if name_node.kind() != "identifier" {
            return;
        }
        let Some(value) = node.child_by_field_name("value") else { return };
        if value.kind() != "new_expression" {
            return;
        }
        let Some(constructor) = value.child_by_field_name("constructor") else { return };
        let line = line_1indexed(node.start_position().row);

        products.type_infos.push(TypeInfo {
            file_id,
            name: text(code, name_node).into_boxed_str(),
            type_name: text(code, constructor).into_boxed_str(),
            line,
            source: TypeInfoSource::Inferred,
            scope_symbol: enclosing,
        });
    }
}

fn collect_identifier_params(params: Node, code: &str) -> Vec<Box<str>> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(text(code, child).into_boxed_str()),
            "required_parameter" | "optional_parameter" | "assignment_pattern" => {
                if let Some(pat) = child.child_by_field_name("pattern").or_else(|| child.child_by_field_name("left")) {
                    out.push(text(code, pat).into_boxed_str());
                }
            }
            _ => {}
        }
    }
    out
}

fn text(code: &str, node: Node) -> String {
    code[node.byte_range()].to_string()
}

fn node_range(node: Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = line_1indexed(start.row);
    let end_line = line_1indexed(end.row);
    Range::new(start_line, start.column as u16, end_line.max(start_line), end.column as u16)
}

impl LanguageParser for JavaScriptParser {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &mut SymbolCounter) -> ParseProducts {
        let mut products = ParseProducts::default();
        let Some(tree) = self.parser.parse(code, None) else {
            tracing::warn!("javascript parser produced no tree for file {:?}", file_id);
            return products;
        };
        self.walk(tree.root_node(), code, file_id, counter, &mut products, None, 0);
        products
    }

    fn language(&self) -> Language {
        self.language_tag
    }

    fn backend(&self) -> ParserBackend {
        ParserBackend::Ast
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NodeTracker for JavaScriptParser {
    fn get_handled_nodes(&self) -> &std::collections::HashSet<HandledNode> {
        self.node_tracker.get_handled_nodes()
    }

    fn register_handled_node(&mut self, node_kind: &str, node_id: u16) {
        self.node_tracker.register_handled_node(node_kind, node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> ParseProducts {
        let mut parser = JavaScriptParser::new().unwrap();
        let mut counter = SymbolCounter::new();
        parser.parse(code, FileId::new(1).unwrap(), &mut counter)
    }

    #[test]
    fn extracts_class_with_extends_and_methods() {
        let products = parse("class Animal {}\n\nclass Dog extends Animal {\n  bark() {\n    return 1;\n  }\n}\n");
        let dog = products.symbols.iter().find(|s| s.name.as_ref() == "Dog").unwrap();
        assert_eq!(dog.bases.len(), 1);
        assert!(products.symbols.iter().any(|s| s.name.as_ref() == "bark" && s.kind == SymbolKind::Method));
    }

    #[test]
    fn extracts_named_imports_and_calls() {
        let products = parse("import { readFile } from 'fs';\n\nfunction f() {\n  readFile('x');\n  console.log('y');\n}\n");
        assert!(products.import_links.iter().any(|l| l.module.as_ref() == "fs" && l.imported_symbols[0].as_ref() == "readFile"));
        assert!(products.calls.iter().any(|c| c.callee_name.as_ref() == "readFile"));
        assert!(products.method_calls.iter().any(|m| m.method_name.as_ref() == "log"));
    }

    #[test]
    fn infers_new_expression_type() {
        let products = parse("function f() {\n  const client = new Client();\n}\n");
        assert!(products.type_infos.iter().any(|t| t.name.as_ref() == "client" && t.type_name.as_ref() == "Client"));
    }
}
