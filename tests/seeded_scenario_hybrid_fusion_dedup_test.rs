//! Scenario 6: a symbol that ranks first in both the keyword and semantic
//! lists is deduped into one `both`-tagged hit, ranked ahead of a symbol that
//! only appears in one list.

use cerberus::retrieval::fusion::{reciprocal_rank_fusion, MatchType};
use cerberus::types::SymbolId;

fn sid(n: u32) -> SymbolId {
    SymbolId::new(n).unwrap()
}

#[test]
fn agreement_across_lists_outranks_single_list_presence() {
    let s = sid(1);
    let t = sid(2);

    let keyword = vec![(s, 0.9)];
    let semantic = vec![(s, 0.7), (t, 0.5)];

    let fused = reciprocal_rank_fusion(&keyword, &semantic, 60.0);

    assert_eq!(fused.len(), 2);
    assert_eq!(fused[0].symbol_id, s);
    assert_eq!(fused[0].match_type, MatchType::Both);
    assert_eq!(fused[1].symbol_id, t);
    assert!(matches!(fused[1].match_type, MatchType::Keyword | MatchType::Semantic));
}
