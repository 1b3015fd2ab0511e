//! Tree-sitter-backed Go parser (§4.B AST backend).
//!
//! Go has no class hierarchy, so `Symbol::bases` stays empty for every Go
//! symbol — struct embedding is a composition relation, not an inheritance
//! one, and §4.C's MRO computation degenerates to the identity chain for it.
//! Methods are free functions carrying a receiver; the receiver's base type
//! becomes the method-call resolution key instead of `self`.

use super::parser::{
    check_recursion_depth, line_1indexed, HandledNode, LanguageParser, NodeTracker,
    NodeTrackingState, ParseProducts, ParserBackend,
};
use crate::model::{CallReference, ImportLink, ImportReference, MethodCall, TypeInfo, TypeInfoSource};
use crate::types::{FileId, Language, Range, SymbolCounter, SymbolId, SymbolKind};
use crate::Symbol;
use std::any::Any;
use tree_sitter::{Node, Parser};

pub struct GoParser {
    parser: Parser,
    node_tracker: NodeTrackingState,
}

impl GoParser {
    pub fn new() -> Result<Self, String> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| format!("failed to set Go grammar: {e}"))?;
        Ok(Self {
            parser,
            node_tracker: NodeTrackingState::new(),
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
            "function_declaration" => {
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
            "method_declaration" => {
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
            "type_declaration" => {
                self.register(node);
                self.process_type_declaration(node, code, file_id, counter, products);
            }
            "import_declaration" => {
                self.process_import_declaration(node, code, file_id, products);
            }
            "call_expression" => {
                self.process_call(node, code, file_id, enclosing, products);
            }
            "short_var_declaration" => {
                self.process_short_var_decl(node, code, file_id, enclosing, products);
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
        let name_node = node.child_by_field_name("name")?;
        let name = text(code, name_node);
        let range = node_range(node);
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| collect_go_params(p, code))
            .unwrap_or_default();

        let receiver_type = node
            .child_by_field_name("receiver")
            .and_then(|r| receiver_type_name(r, code));

        let mut signature = String::from("func ");
        if let Some(rt) = &receiver_type {
            signature.push_str(&format!("({rt}) "));
        }
        signature.push_str(&name);
        if let Some(p) = node.child_by_field_name("parameters") {
            signature.push_str(&text(code, p));
        }

        let mut symbol = Symbol::new(counter.next_symbol_id(), name, kind, file_id, Language::Go, range)
            .with_signature(signature)
            .with_parameters(parameters);
        if let Some(rt) = receiver_type {
            symbol = symbol.with_metadata("receiver_type", rt);
        }
        Some(symbol)
    }

    fn process_type_declaration(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        counter: &mut SymbolCounter,
        products: &mut ParseProducts,
    ) {
        let mut cursor = node.walk();
        for spec in node.children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else { continue };
            let Some(type_node) = spec.child_by_field_name("type") else { continue };
            let kind = match type_node.kind() {
                "struct_type" => SymbolKind::Struct,
                "interface_type" => SymbolKind::Interface,
                _ => continue,
            };
            let range = node_range(spec);
            let symbol = Symbol::new(counter.next_symbol_id(), text(code, name_node), kind, file_id, Language::Go, range);
            products.symbols.push(symbol);
        }
    }

    fn process_import_declaration(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        products: &mut ParseProducts,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_import_spec(child, code, file_id, products);
        }
    }

    fn collect_import_spec(&mut self, node: Node, code: &str, file_id: FileId, products: &mut ParseProducts) {
        match node.kind() {
            "import_spec" => {
                let line = line_1indexed(node.start_position().row);
                let Some(path_node) = node.child_by_field_name("path") else { return };
                let module = text(code, path_node).trim_matches('"').to_string();
                let alias = node.child_by_field_name("name").map(|n| text(code, n));
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
            "import_spec_list" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.collect_import_spec(child, code, file_id, products);
                }
            }
            _ => {}
        }
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
            "selector_expression" => {
                let Some(operand) = function.child_by_field_name("operand") else { return };
                let Some(field) = function.child_by_field_name("field") else { return };
                products.method_calls.push(MethodCall {
                    caller_file: file_id,
                    caller_symbol: enclosing,
                    receiver_expression: text(code, operand).into_boxed_str(),
                    method_name: text(code, field).into_boxed_str(),
                    line,
                });
            }
            _ => {}
        }
    }

    fn process_short_var_decl(
        &mut self,
        node: Node,
        code: &str,
        file_id: FileId,
        enclosing: Option<SymbolId>,
        products: &mut ParseProducts,
    ) {
        let Some(left) = node.child_by_field_name("left") else { return };
        let Some(right) = node.child_by_field_name("right") else { return };
        let line = line_1indexed(node.start_position().row);

        let mut left_cursor = left.walk();
        let mut right_cursor = right.walk();
        let names: Vec<Node> = left.children(&mut left_cursor).filter(|n| n.kind() == "identifier").collect();
        let values: Vec<Node> = right.children(&mut right_cursor).collect();

        for (name_node, value) in names.iter().zip(values.iter()) {
            let type_name = match value.kind() {
                "call_expression" => value.child_by_field_name("function").map(|f| text(code, f)),
                "composite_literal" => value.child_by_field_name("type").map(|t| text(code, t)),
                _ => None,
            };
            if let Some(type_name) = type_name {
                products.type_infos.push(TypeInfo {
                    file_id,
                    name: text(code, *name_node).into_boxed_str(),
                    type_name: type_name.into_boxed_str(),
                    line,
                    source: TypeInfoSource::Inferred,
                    scope_symbol: enclosing,
                });
            }
        }
    }
}

fn receiver_type_name(receiver: Node, code: &str) -> Option<String> {
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() == "parameter_declaration" {
            if let Some(ty) = param.child_by_field_name("type") {
                let raw = text(code, ty);
                return Some(raw.trim_start_matches('*').to_string());
            }
        }
    }
    None
}

fn collect_go_params(params: Node, code: &str) -> Vec<Box<str>> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if child.kind() == "parameter_declaration" {
            if let Some(name) = child.child_by_field_name("name") {
                out.push(text(code, name).into_boxed_str());
            }
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

impl LanguageParser for GoParser {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &mut SymbolCounter) -> ParseProducts {
        let mut products = ParseProducts::default();
        let Some(tree) = self.parser.parse(code, None) else {
            tracing::warn!("go parser produced no tree for file {:?}", file_id);
            return products;
        };
        self.walk(tree.root_node(), code, file_id, counter, &mut products, None, 0);
        products
    }

    fn language(&self) -> Language {
        Language::Go
    }

    fn backend(&self) -> ParserBackend {
        ParserBackend::Ast
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl NodeTracker for GoParser {
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
        let mut parser = GoParser::new().unwrap();
        let mut counter = SymbolCounter::new();
        parser.parse(code, FileId::new(1).unwrap(), &mut counter)
    }

    #[test]
    fn extracts_struct_and_method_with_receiver() {
        let products = parse(
            "package main\n\ntype Server struct {\n  addr string\n}\n\nfunc (s *Server) Start() error {\n  return nil\n}\n",
        );
        assert!(products.symbols.iter().any(|s| s.name.as_ref() == "Server" && s.kind == SymbolKind::Struct));
        let start = products.symbols.iter().find(|s| s.name.as_ref() == "Start").unwrap();
        assert_eq!(start.kind, SymbolKind::Method);
        assert_eq!(start.metadata.get("receiver_type").map(String::as_str), Some("Server"));
    }

    #[test]
    fn extracts_imports_and_selector_calls() {
        let products = parse(
            "package main\n\nimport (\n  \"fmt\"\n  \"os\"\n)\n\nfunc main() {\n  fmt.Println(\"hi\")\n  os.Exit(0)\n}\n",
        );
        assert!(products.imports.iter().any(|i| i.module.as_ref() == "fmt"));
        assert!(products.imports.iter().any(|i| i.module.as_ref() == "os"));
        assert!(products.method_calls.iter().any(|m| m.method_name.as_ref() == "Println"));
    }

    #[test]
    fn infers_constructor_from_short_var_decl() {
        let products = parse(
            "package main\n\nfunc run() {\n  c := NewClient()\n}\n",
        );
        assert!(products
            .type_infos
            .iter()
            .any(|t| t.name.as_ref() == "c" && t.type_name.as_ref() == "NewClient"));
    }
}
