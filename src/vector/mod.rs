//! Vector store (§4.E): symbol-id-keyed semantic index, aligned with the
//! relational store (D) via `EmbeddingMetadata` rows.

pub mod embedding;
pub mod store;

pub use embedding::{symbol_embedding_text, DeterministicVectorizer, Vectorizer};
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedVectorizer;
pub use store::{l2_normalize, VectorStore, VECTOR_DIMENSION_DEFAULT};
