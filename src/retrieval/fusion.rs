//! Rank and score fusion between the keyword and semantic result lists
//! (§4.G "Fusion"): reciprocal rank fusion and weighted score fusion, plus
//! the dedup-by-natural-key merge both end up sharing.

use crate::types::SymbolId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Keyword,
    Semantic,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionStrategy {
    ReciprocalRank,
    WeightedScore,
}

#[derive(Debug, Clone, Copy)]
pub struct RankedResult {
    pub symbol_id: SymbolId,
    pub score: f32,
    pub match_type: MatchType,
}

/// `score = sum(1 / (k + rank))` across whichever of the two lists a symbol
/// appears in, 1-indexed rank (§4.G). Ties are broken by earlier appearance
/// in the keyword list, the keyword-preferring bias the spec calls for.
pub fn reciprocal_rank_fusion(keyword: &[(SymbolId, f32)], semantic: &[(SymbolId, f32)], k: f32) -> Vec<RankedResult> {
    let mut scores: HashMap<SymbolId, f32> = HashMap::new();
    let mut match_types: HashMap<SymbolId, MatchType> = HashMap::new();
    let mut keyword_rank: HashMap<SymbolId, usize> = HashMap::new();

    for (rank, (id, _)) in keyword.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k + rank as f32 + 1.0);
        match_types.insert(*id, MatchType::Keyword);
        keyword_rank.entry(*id).or_insert(rank);
    }
    for (rank, (id, _)) in semantic.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k + rank as f32 + 1.0);
        match_types
            .entry(*id)
            .and_modify(|m| *m = MatchType::Both)
            .or_insert(MatchType::Semantic);
    }

    let mut results: Vec<RankedResult> = scores
        .into_iter()
        .map(|(symbol_id, score)| RankedResult {
            symbol_id,
            score,
            match_type: match_types[&symbol_id],
        })
        .collect();

    sort_with_keyword_bias(&mut results, &keyword_rank);
    results
}

/// `score = w_kw * normalized(bm25) + w_sem * normalized(cosine)`, each list
/// min-max normalized independently before combining (§4.G). A symbol absent
/// from a list contributes 0 from that side.
pub fn weighted_score_fusion(keyword: &[(SymbolId, f32)], semantic: &[(SymbolId, f32)], keyword_weight: f32) -> Vec<RankedResult> {
    let semantic_weight = 1.0 - keyword_weight;
    let keyword_norm = min_max_normalize(keyword);
    let semantic_norm = min_max_normalize(semantic);

    let mut scores: HashMap<SymbolId, f32> = HashMap::new();
    let mut match_types: HashMap<SymbolId, MatchType> = HashMap::new();
    let mut keyword_rank: HashMap<SymbolId, usize> = HashMap::new();

    for (rank, (id, norm)) in keyword_norm.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += keyword_weight * norm;
        match_types.insert(*id, MatchType::Keyword);
        keyword_rank.entry(*id).or_insert(rank);
    }
    for (id, norm) in &semantic_norm {
        *scores.entry(*id).or_insert(0.0) += semantic_weight * norm;
        match_types
            .entry(*id)
            .and_modify(|m| *m = MatchType::Both)
            .or_insert(MatchType::Semantic);
    }

    let mut results: Vec<RankedResult> = scores
        .into_iter()
        .map(|(symbol_id, score)| RankedResult {
            symbol_id,
            score,
            match_type: match_types[&symbol_id],
        })
        .collect();

    sort_with_keyword_bias(&mut results, &keyword_rank);
    results
}

fn min_max_normalize(list: &[(SymbolId, f32)]) -> Vec<(SymbolId, f32)> {
    if list.is_empty() {
        return Vec::new();
    }
    let min = list.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = list.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;
    list.iter()
        .map(|(id, s)| (*id, if span > 0.0 { (s - min) / span } else { 1.0 }))
        .collect()
}

/// Stable sort by score descending; among equal scores, earlier keyword-list
/// appearance wins, then symbols absent from the keyword list altogether.
fn sort_with_keyword_bias(results: &mut [RankedResult], keyword_rank: &HashMap<SymbolId, usize>) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                let a_rank = keyword_rank.get(&a.symbol_id).copied().unwrap_or(usize::MAX);
                let b_rank = keyword_rank.get(&b.symbol_id).copied().unwrap_or(usize::MAX);
                a_rank.cmp(&b_rank)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u32) -> SymbolId {
        SymbolId::new(n).unwrap()
    }

    #[test]
    fn result_in_both_lists_is_tagged_both() {
        let keyword = vec![(sid(1), 5.0), (sid(2), 3.0)];
        let semantic = vec![(sid(2), 0.9), (sid(3), 0.8)];
        let fused = reciprocal_rank_fusion(&keyword, &semantic, 60.0);

        let two = fused.iter().find(|r| r.symbol_id == sid(2)).unwrap();
        assert_eq!(two.match_type, MatchType::Both);
        let one = fused.iter().find(|r| r.symbol_id == sid(1)).unwrap();
        assert_eq!(one.match_type, MatchType::Keyword);
    }

    #[test]
    fn rrf_ranks_higher_for_agreement_across_lists() {
        let keyword = vec![(sid(1), 5.0), (sid(2), 3.0), (sid(3), 1.0)];
        let semantic = vec![(sid(3), 0.9), (sid(2), 0.5)];
        let fused = reciprocal_rank_fusion(&keyword, &semantic, 60.0);
        // symbol 2 appears near the top of both lists, symbol 1 only in one.
        let rank_of = |id: SymbolId| fused.iter().position(|r| r.symbol_id == id).unwrap();
        assert!(rank_of(sid(2)) < rank_of(sid(1)));
    }

    #[test]
    fn weighted_fusion_normalizes_each_list_independently() {
        let keyword = vec![(sid(1), 10.0), (sid(2), 0.0)];
        let semantic = vec![(sid(1), 0.2), (sid(2), 0.8)];
        let fused = weighted_score_fusion(&keyword, &semantic, 0.5);
        // after min-max normalization symbol 1 gets (1.0*0.5 + 0.0*0.5) = 0.5,
        // symbol 2 gets (0.0*0.5 + 1.0*0.5) = 0.5: a tie, broken by keyword rank.
        assert_eq!(fused[0].symbol_id, sid(1));
    }

    #[test]
    fn empty_lists_produce_no_results() {
        let fused = reciprocal_rank_fusion(&[], &[], 60.0);
        assert!(fused.is_empty());
    }
}
