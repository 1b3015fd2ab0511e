//! Core identifiers and closed-set enumerations shared across the crate.
//!
//! The source this crate is modeled on treats symbol kinds, reference kinds,
//! query modes and risk levels as open strings; here they are closed
//! enumerations so callers get compile-time exhaustiveness instead of typos
//! surfacing at query time.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

/// Opaque handle into the vector store; stable across incremental updates
/// for symbols whose file was not touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VectorId(pub u32);

impl SymbolId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    pub fn as_non_zero(&self) -> NonZeroU32 {
        self.0
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    pub fn as_non_zero(&self) -> NonZeroU32 {
        self.0
    }
}

/// Monotonic id allocator for Symbols and Files. One instance per build or
/// incremental update so freshly-minted ids never collide with ids already
/// committed to the store (the caller seeds it from `get_stats()` on resume).
#[derive(Debug)]
pub struct SymbolCounter {
    next_symbol: u32,
    next_file: u32,
}

impl SymbolCounter {
    pub fn new() -> Self {
        Self {
            next_symbol: 1,
            next_file: 1,
        }
    }

    pub fn starting_at(next_symbol: u32, next_file: u32) -> Self {
        Self {
            next_symbol: next_symbol.max(1),
            next_file: next_file.max(1),
        }
    }

    pub fn next_symbol_id(&mut self) -> SymbolId {
        let id = SymbolId::new(self.next_symbol).expect("counter never emits zero");
        self.next_symbol += 1;
        id
    }

    pub fn next_file_id(&mut self) -> FileId {
        let id = FileId::new(self.next_file).expect("counter never emits zero");
        self.next_file += 1;
        id
    }
}

impl Default for SymbolCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }

    /// P1: spans for multi-statement bodies must not collapse to one line.
    pub fn is_sane_for_body(&self, single_statement_body: bool) -> bool {
        if self.end_line < self.start_line {
            return false;
        }
        if self.end_line == self.start_line {
            return single_statement_body;
        }
        true
    }
}

/// Closed set of symbol kinds (§3, §9 "closed sets & tagged variants").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Enum,
    Variable,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Module => "module",
        }
    }

    /// Whether MRO/inheritance resolution applies to this kind.
    pub fn is_class_like(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Interface)
    }

    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "struct" => Some(Self::Struct),
            "interface" => Some(Self::Interface),
            "enum" => Some(Self::Enum),
            "variable" => Some(Self::Variable),
            "module" => Some(Self::Module),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved-edge kind (`SymbolReference.reference_kind`, §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Calls,
    Inherits,
    Imports,
    Instantiates,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Inherits => "inherits",
            Self::Imports => "imports",
            Self::Instantiates => "instantiates",
        }
    }

    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s {
            "calls" => Some(Self::Calls),
            "inherits" => Some(Self::Inherits),
            "imports" => Some(Self::Imports),
            "instantiates" => Some(Self::Instantiates),
            _ => None,
        }
    }
}

/// How a query should be executed (§4.G, §6 `hybrid_search`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryMode {
    Keyword,
    Semantic,
    Balanced,
}

/// Which source list(s) produced a hit (§4.G fusion, seeded scenario 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Keyword,
    Semantic,
    Both,
}

/// Risk-gate classification for mutation targets (§4.H, SPEC_FULL §B.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Medium,
    High,
}

/// Direction for call-graph walks (§6 `call_graph`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphDirection {
    Forward,
    Reverse,
}

/// Well-known language tags (§6). Narrower than the teacher's Language enum:
/// Cerberus's core only ships Python/TypeScript/JavaScript/Go backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Go,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Self::Python),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py", "pyi"],
            Self::TypeScript => &["ts", "tsx", "mts", "cts"],
            Self::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Self::Go => &["go"],
        }
    }

    /// Tag used in `Symbol.language` and config lookups (§6 "well-known identifiers").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Go => "go",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "python" => Some(Self::Python),
            "typescript" => Some(Self::TypeScript),
            "javascript" => Some(Self::JavaScript),
            "go" => Some(Self::Go),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_rejects_zero() {
        assert!(SymbolId::new(0).is_none());
        assert_eq!(SymbolId::new(42).unwrap().value(), 42);
    }

    #[test]
    fn range_contains_bounds() {
        let range = Range::new(10, 5, 15, 20);
        assert!(range.contains(10, 5));
        assert!(range.contains(15, 20));
        assert!(!range.contains(9, 10));
        assert!(!range.contains(10, 4));
    }

    #[test]
    fn range_sanity_rejects_collapsed_multistatement_body() {
        let collapsed = Range::new(3, 0, 3, 10);
        assert!(!collapsed.is_sane_for_body(false));
        assert!(collapsed.is_sane_for_body(true));
        let multiline = Range::new(3, 0, 5, 1);
        assert!(multiline.is_sane_for_body(false));
    }

    #[test]
    fn language_roundtrips_through_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("go"), Some(Language::Go));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn counter_never_emits_colliding_ids() {
        let mut counter = SymbolCounter::new();
        let a = counter.next_symbol_id();
        let b = counter.next_symbol_id();
        assert_ne!(a, b);
    }
}
