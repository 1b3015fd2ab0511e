//! Hybrid Retriever (§4.G): query-mode auto-detection, lexical + vector
//! search, rank/score fusion, and span reads, composed over the Index Store
//! and Vector Store.

pub mod fusion;
pub mod query_mode;
pub mod retriever;
pub mod span;

pub use fusion::{FusionStrategy, MatchType, RankedResult};
pub use query_mode::QueryMode;
pub use retriever::{Hit, HybridRetriever};
pub use span::{read_skeleton, read_span, Snippet};
