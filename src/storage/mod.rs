//! The relational store (§4.D): a single Tantivy index realizing every
//! logical table, plus the in-memory call/inheritance graph (§4.C.7, §6
//! `call_graph`) built from it.

pub mod graph;
pub mod schema;
pub mod store;

pub use graph::{CodeGraph, GraphEdge};
pub use schema::IndexSchema;
pub use store::{escape_fts_query, IndexStore, StoreStats, SymbolCursor, Transaction};
