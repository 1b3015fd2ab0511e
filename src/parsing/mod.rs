//! Parsing subsystem (§4.B): per-language AST extraction with a regex
//! fallback, unified behind the `LanguageParser` trait.

pub mod factory;
pub mod go;
pub mod javascript;
pub mod language;
pub mod parser;
pub mod python;
pub mod regex_fallback;
pub mod typescript;

pub use factory::DefaultParserFactory;
pub use language::Language;
pub use parser::{LanguageParser, ParseProducts, ParserBackend, ParserFactory};
