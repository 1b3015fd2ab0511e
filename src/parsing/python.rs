//! Tree-sitter-backed Python parser (§4.B AST backend).
//!
//! Grounded in the teacher's `javascript::parser` traversal idiom — a single
//! recursive walk over the tree guarded by `check_recursion_depth`, tracking
//! the innermost enclosing symbol so calls and method calls can be attributed
//! to their caller — retargeted at `ParseProducts` instead of a flat `Vec<Symbol>`.

use super::parser::{
    check_recursion_depth, line_1indexed, HandledNode, LanguageParser, NodeTracker,
    NodeTrackingState, ParseProducts, ParserBackend,
};
use crate::model::{CallReference, ImportLink, ImportReference, MethodCall, TypeInfo, TypeInfoSource};
use crate::types::{FileId, Language, Range, SymbolCounter, SymbolId, SymbolKind};
use crate::Symbol;
use std::any::Any;
use tree_sitter::{Node, Parser};

pub struct PythonParser {
    parser: Parser,
    node_tracker: NodeTrackingState,
}

impl PythonParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| format!("failed to set Python grammar: {e}"))?;
        Ok(Self {
            parser,
            node_tracker: NodeTrackingState::new(),
        })
    }

    fn register(&mut self, node: Node) {
        self.node_tracker
            .register_handled_node(node.kind(), node.kind_id());
    }

    /// `container_kind` is the kind of the symbol whose body directly
    /// encloses `node` — `Some(SymbolKind::Class)` when walking a class
    /// body's direct statements, `None` everywhere else. Python's grammar
    /// has a single `function_definition` node for both free functions and
    /// methods (unlike Go's `method_declaration` or TS/JS's
    /// `method_definition`), so this is how the distinction is recovered.
    #[allow(clippy::too_many_arguments)]
    fn walk(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &mut SymbolCounter,
        products: &mut ParseProducts,
        enclosing: Option<SymbolId>,
        container_kind: Option<SymbolKind>,
        depth: usize,
    ) {
        if !check_recursion_depth(depth, node) {
            return;
        }

        match node.kind() {
            "function_definition" => {
                self.register(node);
                let kind = if container_kind == Some(SymbolKind::Class) {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                if let Some(symbol) = self.process_function(node, code, file_id, counter, kind) {
                    let id = symbol.id;
                    products.symbols.push(symbol);
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk(body, code, file_id, counter, products, Some(id), None, depth + 1);
                    }
                    return;
                }
            }
            "class_definition" => {
                self.register(node);
                if let Some(symbol) = self.process_class(node, code, file_id, counter) {
                    let id = symbol.id;
                    products.symbols.push(symbol);
                    if let Some(body) = node.child_by_field_name("body") {
                        self.walk(body, code, file_id, counter, products, Some(id), Some(SymbolKind::Class), depth + 1);
                    }
                    return;
                }
            }
            "import_statement" => {
                self.process_import_statement(node, code, file_id, products);
            }
            "import_from_statement" => {
                self.process_import_from(node, code, file_id, products);
            }
            "call" => {
                self.process_call(node, code, file_id, enclosing, products);
            }
            "assignment" => {
                self.process_assignment(node, code, file_id, enclosing, products);
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, code, file_id, counter, products, enclosing, container_kind, depth + 1);
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
        let name_node = node.child_by_field_name("name")?;
        let name = text(code, name_node);
        let range = node_range(node);
        let parameters = self.collect_parameters(node, code, file_id, counter);
        let signature = node
            .child_by_field_name("parameters")
            .map(|p| format!("def {name}{}", text(code, p)));

        let mut symbol = Symbol::new(counter.next_symbol_id(), name, kind, file_id, Language::Python, range);
        if let Some(sig) = signature {
            symbol = symbol.with_signature(sig);
        }
        symbol = symbol.with_parameters(parameters.iter().map(|p| p.name.clone().into_boxed_str()).collect());
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
            .child_by_field_name("superclasses")
            .map(|args| {
                let mut cursor = args.walk();
                args.children(&mut cursor)
                    .filter(|c| c.kind() == "identifier" || c.kind() == "attribute")
                    .map(|c| text(code, c).into_boxed_str())
                    .collect()
            })
            .unwrap_or_default();

        let symbol = Symbol::new(counter.next_symbol_id(), name, SymbolKind::Class, file_id, Language::Python, range)
            .with_bases(bases);
        Some(symbol)
    }

    fn collect_parameters(
        &mut self,
        func_node: Node,
        code: &str,
        file_id: FileId,
        _counter: &mut SymbolCounter,
    ) -> Vec<ParamInfo> {
        let mut out = Vec::new();
        let Some(params) = func_node.child_by_field_name("parameters") else {
            return out;
        };
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            match child.kind() {
                "identifier" => out.push(ParamInfo { name: text(code, child), type_name: None }),
                "typed_parameter" => {
                    let mut inner = child.walk();
                    let ident = child
                        .children(&mut inner)
                        .find(|c| c.kind() == "identifier")
                        .map(|c| text(code, c));
                    let ty = child.child_by_field_name("type").map(|t| text(code, t));
                    if let Some(name) = ident {
                        out.push(ParamInfo { name, type_name: ty });
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let ident = child.child_by_field_name("name").map(|c| text(code, c));
                    let ty = child.child_by_field_name("type").map(|t| text(code, t));
                    if let Some(name) = ident {
                        out.push(ParamInfo { name, type_name: ty });
                    }
                }
                _ => {}
            }
        }
        let _ = file_id;
        out
    }

    fn process_import_statement(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        products: &mut ParseProducts,
    ) {
        let line = line_1indexed(node.start_position().row);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let module = text(code, child);
                    products.imports.push(ImportReference { file_id, module: module.clone().into_boxed_str(), line });
                    products.import_links.push(ImportLink {
                        file_id,
                        module: module.into_boxed_str(),
                        imported_symbols: Vec::new(),
                        alias: None,
                        is_glob: false,
                        line,
                        definition_file: None,
                        definition_symbol: None,
                    });
                }
                "aliased_import" => {
                    let module = child.child_by_field_name("name").map(|n| text(code, n)).unwrap_or_default();
                    let alias = child.child_by_field_name("alias").map(|n| text(code, n));
                    products.imports.push(ImportReference { file_id, module: module.clone().into_boxed_str(), line });
                    products.import_links.push(ImportLink {
                        file_id,
                        module: module.into_boxed_str(),
                        imported_symbols: Vec::new(),
                        alias: alias.map(|a| a.into_boxed_str()),
                        is_glob: false,
                        line,
                        definition_file: None,
                        definition_symbol: None,
                    });
                }
                _ => {}
            }
        }
    }

    fn process_import_from(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        products: &mut ParseProducts,
    ) {
        let line = line_1indexed(node.start_position().row);
        let module = node
            .child_by_field_name("module_name")
            .map(|n| text(code, n))
            .unwrap_or_default();
        products.imports.push(ImportReference { file_id, module: module.clone().into_boxed_str(), line });

        let mut imported_symbols = Vec::new();
        let mut is_glob = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" if text(code, child) != module => imported_symbols.push(text(code, child).into_boxed_str()),
                "aliased_import" => {
                    if let Some(n) = child.child_by_field_name("name") {
                        imported_symbols.push(text(code, n).into_boxed_str());
                    }
                }
                "wildcard_import" => is_glob = true,
                _ => {}
            }
        }

        products.import_links.push(ImportLink {
            file_id,
            module: module.into_boxed_str(),
            imported_symbols,
            alias: None,
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
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
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
            "attribute" => {
                let Some(object) = function.child_by_field_name("object") else { return };
                let Some(attr) = function.child_by_field_name("attribute") else { return };
                products.method_calls.push(MethodCall {
                    caller_file: file_id,
                    caller_symbol: enclosing,
                    receiver_expression: text(code, object).into_boxed_str(),
                    method_name: text(code, attr).into_boxed_str(),
                    line,
                });
            }
            _ => {}
        }
    }

    fn process_assignment(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        enclosing: Option<SymbolId>,
        products: &mut ParseProducts,
    ) {
        let Some(left) = node.child_by_field_name("left") else { return };
        if left.kind() != "identifier" {
            return;
        }
        let name = text(code, left);
        let line = line_1indexed(node.start_position().row);

        if let Some(type_node) = node.child_by_field_name("type") {
            products.type_infos.push(TypeInfo {
                file_id,
                name: name.into_boxed_str(),
                type_name: text(code, type_node).into_boxed_str(),
                line,
                source: TypeInfoSource::Annotation,
                scope_symbol: enclosing,
            });
            return;
        }

        if let Some(right) = node.child_by_field_name("right") {
            if right.kind() == "call" {
                if let Some(function) = right.child_by_field_name("function") {
                    let type_name = match function.kind() {
                        "identifier" => Some(text(code, function)),
                        "attribute" => function.child_by_field_name("attribute").map(|a| text(code, a)),
                        _ => None,
                    };
                    if let Some(type_name) = type_name {
                        if type_name.chars().next().is_some_and(|c| c.is_uppercase()) {
                            products.type_infos.push(TypeInfo {
                                file_id,
                                name: name.into_boxed_str(),
                                type_name: type_name.into_boxed_str(),
                                line,
                                source: TypeInfoSource::Inferred,
                                scope_symbol: enclosing,
                            });
                        }
                    }
                }
            }
        }
    }
}

struct ParamInfo {
    name: String,
    #[allow(dead_code)]
    type_name: Option<String>,
}

fn text(code: &str, node: Node) -> String {
    code[node.byte_range()].to_string()
}

fn node_range(node: Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = line_1indexed(start.row);
    let mut end_line = line_1indexed(end.row);
    if end_line == start_line && end.row > start.row {
        end_line = start_line;
    }
    Range::new(start_line, start.column as u16, end_line.max(start_line), end.column as u16)
}

impl LanguageParser for PythonParser {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &mut SymbolCounter) -> ParseProducts {
        let mut products = ParseProducts::default();
        let Some(tree) = self.parser.parse(code, None) else {
            tracing::warn!("python parser produced no tree for file {:?}", file_id);
            return products;
        };
        self.walk(tree.root_node(), code, file_id, counter, &mut products, None, None, 0);

        // Attach explicit type annotations from typed function parameters.
        let mut cursor = tree.walk();
        collect_param_type_infos(tree.root_node(), code, file_id, &mut products, &mut cursor);

        products
    }

    fn language(&self) -> Language {
        Language::Python
    }

    fn backend(&self) -> ParserBackend {
        ParserBackend::Ast
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn collect_param_type_infos(
    node: Node,
    code: &str,
    file_id: FileId,
    products: &mut ParseProducts,
    cursor: &mut tree_sitter::TreeCursor,
) {
    if node.kind() == "typed_parameter" {
        let mut inner = node.walk();
        let ident = node.children(&mut inner).find(|c| c.kind() == "identifier");
        if let (Some(ident), Some(ty)) = (ident, node.child_by_field_name("type")) {
            products.type_infos.push(TypeInfo {
                file_id,
                name: text(code, ident).into_boxed_str(),
                type_name: text(code, ty).into_boxed_str(),
                line: line_1indexed(node.start_position().row),
                source: TypeInfoSource::Annotation,
                scope_symbol: None,
            });
        }
    }
    for child in node.children(cursor) {
        let mut child_cursor = child.walk();
        collect_param_type_infos(child, code, file_id, products, &mut child_cursor);
    }
}

impl NodeTracker for PythonParser {
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
        let mut parser = PythonParser::new().unwrap();
        let mut counter = SymbolCounter::new();
        parser.parse(code, FileId::new(1).unwrap(), &mut counter)
    }

    #[test]
    fn extracts_function_and_class_with_bases() {
        let products = parse(
            "class Animal:\n    pass\n\n\nclass Dog(Animal):\n    def bark(self):\n        return 1\n",
        );
        let class_sym = products.symbols.iter().find(|s| s.name.as_ref() == "Dog").unwrap();
        assert_eq!(class_sym.bases.len(), 1);
        assert_eq!(class_sym.bases[0].as_ref(), "Animal");
        assert!(products.symbols.iter().any(|s| s.name.as_ref() == "bark" && s.kind == SymbolKind::Method));
    }

    #[test]
    fn free_function_stays_a_function_even_alongside_a_same_named_method() {
        let products = parse("class C:\n    def run(self):\n        pass\n\ndef run():\n    pass\n");
        let kinds: Vec<_> = products.symbols.iter().filter(|s| s.name.as_ref() == "run").map(|s| s.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&SymbolKind::Method));
        assert!(kinds.contains(&SymbolKind::Function));
    }

    #[test]
    fn extracts_imports_and_calls() {
        let products = parse("import os\nfrom typing import List, Optional\n\ndef f():\n    os.getcwd()\n    len([])\n");
        assert!(products.imports.iter().any(|i| i.module.as_ref() == "os"));
        assert!(products.import_links.iter().any(|l| l.module.as_ref() == "typing" && l.imported_symbols.len() == 2));
        assert!(products.method_calls.iter().any(|m| m.method_name.as_ref() == "getcwd"));
        assert!(products.calls.iter().any(|c| c.callee_name.as_ref() == "len"));
    }

    #[test]
    fn infers_constructor_assignment_type() {
        let products = parse("def f():\n    client = Client()\n");
        assert!(products
            .type_infos
            .iter()
            .any(|t| t.name.as_ref() == "client" && t.type_name.as_ref() == "Client" && t.source == TypeInfoSource::Inferred));
    }
}
