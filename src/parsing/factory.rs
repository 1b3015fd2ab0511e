//! Default `ParserFactory`: one AST parser per language, falling back to the
//! regex parser when the tree-sitter grammar fails to initialize (§4.B
//! strategy selection). Grounded in the teacher's `parsing::factory`, which
//! kept this same decoupling between factory and concrete parser types.

use super::go::GoParser;
use super::javascript::JavaScriptParser;
use super::parser::{LanguageParser, ParserFactory};
use super::python::PythonParser;
use super::regex_fallback::RegexFallbackParser;
use super::typescript::TypeScriptParser;
use crate::types::Language;

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParserFactory;

impl ParserFactory for DefaultParserFactory {
    fn create(&self, language: Language) -> Result<Box<dyn LanguageParser>, String> {
        let ast: Result<Box<dyn LanguageParser>, String> = match language {
            Language::Python => PythonParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::TypeScript => TypeScriptParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::JavaScript => JavaScriptParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
            Language::Go => GoParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
        };

        match ast {
            Ok(parser) => Ok(parser),
            Err(reason) => {
                tracing::warn!(%language, %reason, "falling back to regex parser");
                Ok(Box::new(RegexFallbackParser::new(language)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_an_ast_parser_for_every_supported_language() {
        let factory = DefaultParserFactory;
        for language in [Language::Python, Language::TypeScript, Language::JavaScript, Language::Go] {
            let parser = factory.create(language).unwrap();
            assert_eq!(parser.backend(), super::super::parser::ParserBackend::Ast);
        }
    }
}
