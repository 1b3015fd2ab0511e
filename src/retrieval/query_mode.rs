//! Query-type auto-detection (§4.G): cheap lexical features decide whether a
//! query reads as a keyword lookup or a natural-language question.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Keyword,
    Semantic,
    /// Forces both lists regardless of what auto-detection would pick.
    Balanced,
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "how", "what", "where", "when", "why", "do",
    "does", "did", "to", "of", "in", "on", "for", "with", "that", "this",
];

/// Classifies free text as `Keyword` or `Semantic` (§4.G). Never returns
/// `Balanced` — that mode is only ever chosen explicitly by the caller.
pub fn classify(query: &str) -> QueryMode {
    let trimmed = query.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();

    if words.len() <= 1 {
        return QueryMode::Keyword;
    }
    if words.len() < 3 && words.iter().all(|w| looks_like_identifier(w)) {
        return QueryMode::Keyword;
    }

    let has_stop_word = words
        .iter()
        .any(|w| STOP_WORDS.contains(&w.to_lowercase().as_str()));
    if words.len() > 8 && has_stop_word {
        return QueryMode::Semantic;
    }
    if has_stop_word {
        return QueryMode::Semantic;
    }

    QueryMode::Keyword
}

fn looks_like_identifier(word: &str) -> bool {
    is_camel_case(word) || is_snake_case(word) || word.chars().all(|c| c.is_alphanumeric())
}

fn is_camel_case(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase()) && word.chars().any(|c| c.is_lowercase()) && !word.contains('_')
}

fn is_snake_case(word: &str) -> bool {
    word.contains('_') && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_is_keyword() {
        assert_eq!(classify("handle_request"), QueryMode::Keyword);
    }

    #[test]
    fn camel_case_identifier_is_keyword() {
        assert_eq!(classify("HttpClient connect"), QueryMode::Keyword);
    }

    #[test]
    fn natural_language_phrase_is_semantic() {
        assert_eq!(classify("how do we retry a failed request"), QueryMode::Semantic);
    }

    #[test]
    fn long_query_with_stop_words_is_semantic() {
        assert_eq!(
            classify("where is the logic that decides how to retry a failed network request"),
            QueryMode::Semantic
        );
    }
}
