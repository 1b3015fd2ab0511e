//! Mutation Engine (§4.H): safe, symbol-scoped edits to source files.
//!
//! Pipeline: Locate → Reformat → Splice → (syntax) validate → Atomic write →
//! Ledger → Index refresh, plus an advisory risk gate ahead of the write and
//! an optional three-way merge a caller can reach for on lock failure.

pub mod atomic_write;
pub mod engine;
pub mod guard;
pub mod ledger;
pub mod locate;
pub mod merge;
pub mod reformat;
pub mod splice;
pub mod validate;

pub use engine::{MutationEngine, MutationOptions, MutationOutcome};
pub use guard::RiskLevel;
pub use ledger::{DiffLedger, DiffMetric, MutationOperation};
pub use locate::Located;
