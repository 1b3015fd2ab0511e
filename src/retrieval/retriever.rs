//! Hybrid retrieval (§4.G): runs the keyword and/or semantic lists per the
//! requested mode, fuses them, and renders each result as a `Hit` with a
//! ready-to-display snippet.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::retrieval::fusion::{self, FusionStrategy, MatchType};
use crate::retrieval::query_mode::QueryMode;
use crate::retrieval::span;
use crate::storage::IndexStore;
use crate::types::SymbolId;
use crate::vector::{VectorStore, Vectorizer};
use crate::Symbol;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Hit {
    pub symbol: Symbol,
    pub score: f32,
    pub match_type: MatchType,
    pub snippet: String,
}

pub struct HybridRetriever<'a> {
    store: &'a IndexStore,
    vector_store: &'a VectorStore,
    vectorizer: &'a dyn Vectorizer,
    settings: Arc<Settings>,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(store: &'a IndexStore, vector_store: &'a VectorStore, vectorizer: &'a dyn Vectorizer, settings: Arc<Settings>) -> Self {
        Self { store, vector_store, vectorizer, settings }
    }

    /// Runs `query` through whichever of the keyword/semantic lists `mode`
    /// selects, fuses with `fusion_strategy`, and resolves each hit to a
    /// rendered snippet. `mode` is taken literally — `Balanced` runs both
    /// lists; callers wanting auto-detected mode should pass
    /// `query_mode::classify(query)` in as `mode` themselves.
    pub fn search(&self, query: &str, mode: QueryMode, top_k: usize, fusion_strategy: FusionStrategy) -> IndexResult<Vec<Hit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let run_keyword = matches!(mode, QueryMode::Keyword | QueryMode::Balanced);
        let run_semantic = matches!(mode, QueryMode::Semantic | QueryMode::Balanced);

        let keyword_hits = if run_keyword { self.keyword_search(query, top_k)? } else { Vec::new() };
        let semantic_hits = if run_semantic { self.semantic_search(query, top_k)? } else { Vec::new() };

        let ranked = match fusion_strategy {
            FusionStrategy::ReciprocalRank => fusion::reciprocal_rank_fusion(&keyword_hits, &semantic_hits, self.settings.retrieval.rrf_k),
            FusionStrategy::WeightedScore => {
                fusion::weighted_score_fusion(&keyword_hits, &semantic_hits, self.settings.retrieval.keyword_weight)
            }
        };

        let mut hits = Vec::with_capacity(ranked.len().min(top_k));
        for ranked_result in ranked.into_iter().take(top_k) {
            let Some(symbol) = self.store.find_symbol_by_id(ranked_result.symbol_id)? else {
                continue;
            };
            let snippet = self.render_snippet(&symbol).unwrap_or_default();
            hits.push(Hit {
                symbol,
                score: ranked_result.score,
                match_type: ranked_result.match_type,
                snippet,
            });
        }
        Ok(hits)
    }

    fn keyword_search(&self, query: &str, top_k: usize) -> IndexResult<Vec<(SymbolId, f32)>> {
        let results = self.store.fts_search(query, top_k)?;
        Ok(results.into_iter().map(|(symbol, score)| (symbol.id, score)).collect())
    }

    fn semantic_search(&self, query: &str, top_k: usize) -> IndexResult<Vec<(SymbolId, f32)>> {
        let query_vector = self
            .vectorizer
            .embed(query)
            .map_err(|e| IndexError::General(format!("query embedding failed: {e}")))?;
        let results = self
            .vector_store
            .search(&query_vector, top_k)
            .map_err(|e| IndexError::General(format!("vector search failed: {e}")))?;

        let mut out = Vec::with_capacity(results.len());
        for (score, vector_id) in results {
            if let Some(symbol) = self.store.find_symbol_by_vector_id(vector_id)? {
                out.push((symbol.id, score));
            }
        }
        Ok(out)
    }

    fn render_snippet(&self, symbol: &Symbol) -> IndexResult<String> {
        let Some(file) = self.store.find_file_by_id(symbol.file_id)? else {
            return Ok(symbol.lexical_document());
        };
        let path = std::path::Path::new(file.absolute_path.as_ref());
        let source = std::fs::read_to_string(path).map_err(|e| IndexError::FileRead { path: path.to_path_buf(), source: e })?;
        let snippet = span::read_span(&source, symbol.range, self.settings.retrieval.span_padding);
        Ok(snippet.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::IndexStore;
    use crate::vector::DeterministicVectorizer;
    use tempfile::TempDir;

    #[test]
    fn empty_query_returns_no_hits() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let vector_store = VectorStore::new(64);
        let vectorizer = DeterministicVectorizer::new(64);
        let settings = Arc::new(Settings::default());

        let retriever = HybridRetriever::new(&store, &vector_store, &vectorizer, settings);
        let hits = retriever.search("   ", QueryMode::Balanced, 10, FusionStrategy::ReciprocalRank).unwrap();
        assert!(hits.is_empty());
    }
}
