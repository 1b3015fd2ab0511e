//! Risk gate (§4.H "Risk gate"): an advisory HIGH/MEDIUM/SAFE classification
//! derived from two signals already in the data model — upstream reference
//! in-degree (SPEC_FULL §B.4: how many places call into this symbol) and a
//! per-file mutation churn count from the ledger. Fully local, advisory;
//! by default HIGH-risk edits are refused unless the caller passes `force`.

use crate::mutation::ledger::DiffLedger;
use crate::storage::graph::CodeGraph;
use crate::types::{GraphDirection, SymbolId};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Safe,
    Medium,
    High,
}

/// Thresholds are a judgment call (no upstream source specifies numbers):
/// a symbol called from more than `HIGH_RISK_CALLERS` other symbols, or a
/// file mutated more than `HIGH_RISK_CHURN` times already this session, is
/// HIGH risk; half those thresholds is MEDIUM.
const HIGH_RISK_CALLERS: usize = 10;
const MEDIUM_RISK_CALLERS: usize = 3;
const HIGH_RISK_CHURN: usize = 5;
const MEDIUM_RISK_CHURN: usize = 2;

pub fn classify(graph: &CodeGraph, symbol_id: SymbolId, ledger: &DiffLedger, file_path: &Path) -> RiskLevel {
    let caller_count = graph.neighbors(symbol_id, GraphDirection::Reverse, None).len();
    let churn = ledger.mutation_count_for(file_path);

    if caller_count > HIGH_RISK_CALLERS || churn > HIGH_RISK_CHURN {
        RiskLevel::High
    } else if caller_count > MEDIUM_RISK_CALLERS || churn > MEDIUM_RISK_CHURN {
        RiskLevel::Medium
    } else {
        RiskLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceKind;
    use std::path::PathBuf;

    #[test]
    fn unreferenced_symbol_is_safe() {
        let graph = CodeGraph::new();
        let id = SymbolId::new(1).unwrap();
        graph.add_symbol(id);
        let ledger = DiffLedger::default();
        assert_eq!(classify(&graph, id, &ledger, &PathBuf::from("a.py")), RiskLevel::Safe);
    }

    #[test]
    fn heavily_called_symbol_is_high_risk() {
        let graph = CodeGraph::new();
        let target = SymbolId::new(1).unwrap();
        graph.add_symbol(target);
        for n in 2..=13 {
            let caller = SymbolId::new(n).unwrap();
            graph.add_symbol(caller);
            graph.add_edge(caller, target, ReferenceKind::Calls);
        }
        let ledger = DiffLedger::default();
        assert_eq!(classify(&graph, target, &ledger, &PathBuf::from("a.py")), RiskLevel::High);
    }

    #[test]
    fn churn_alone_escalates_risk() {
        let graph = CodeGraph::new();
        let id = SymbolId::new(1).unwrap();
        graph.add_symbol(id);
        let mut ledger = DiffLedger::default();
        let path = PathBuf::from("hot.py");
        for i in 0..6 {
            ledger.record(crate::mutation::ledger::MutationOperation::Edit, path.clone(), 1, 10, None, i);
        }
        assert_eq!(classify(&graph, id, &ledger, &path), RiskLevel::High);
    }
}
