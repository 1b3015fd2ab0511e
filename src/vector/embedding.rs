//! Pluggable text-to-vector embedding (§4.E, §9 "the core never depends on
//! a concrete embedding backend outside an optional feature").

use crate::error::VectorError;

/// `fn(text) -> f32[D]`, implemented by whichever embedding backend a host
/// chooses to wire in. The vector store and retriever depend only on this
/// trait, never on a concrete model.
pub trait Vectorizer: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError>;

    /// Default batch impl calls `embed` per item; backends with native
    /// batching (fastembed) override this.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Deterministic, model-free vectorizer for tests and environments without
/// the `fastembed-embeddings` feature: hashes overlapping trigrams of the
/// input into a fixed-width vector, then L2-normalizes it. Not meant to
/// produce meaningful semantic neighbors, only a stable mapping that exercises
/// the vector store's contracts without a real model dependency.
pub struct DeterministicVectorizer {
    dimension: usize,
}

impl DeterministicVectorizer {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for DeterministicVectorizer {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Vectorizer for DeterministicVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let mut v = vec![0.0f32; self.dimension];
        let bytes = text.as_bytes();
        if bytes.len() < 3 {
            v[0] = 1.0;
            return Ok(v);
        }
        for window in bytes.windows(3) {
            let hash = fnv1a(window);
            let bucket = (hash as usize) % self.dimension;
            v[bucket] += 1.0;
        }
        Ok(crate::vector::store::l2_normalize(v))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Builds the document text a symbol is embedded from: name, signature, and
/// doc summary, matching the lexical document the BM25 index scores over
/// (§4.G) so keyword and semantic search see aligned content.
pub fn symbol_embedding_text(symbol: &crate::Symbol) -> String {
    symbol.lexical_document()
}

#[cfg(feature = "fastembed-embeddings")]
pub struct FastEmbedVectorizer {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
    dimension: usize,
}

#[cfg(feature = "fastembed-embeddings")]
impl FastEmbedVectorizer {
    pub fn try_new() -> Result<Self, VectorError> {
        let model = fastembed::TextEmbedding::try_new(Default::default())
            .map_err(|e| VectorError::Persist {
                path: std::path::PathBuf::from("<fastembed-init>"),
                source: std::io::Error::other(e.to_string()),
            })?;
        Ok(Self {
            model: std::sync::Mutex::new(model),
            dimension: 384,
        })
    }
}

#[cfg(feature = "fastembed-embeddings")]
impl Vectorizer for FastEmbedVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let embeddings = self
            .model
            .lock()
            .unwrap()
            .embed(vec![text], None)
            .map_err(|e| VectorError::Persist {
                path: std::path::PathBuf::from("<fastembed-embed>"),
                source: std::io::Error::other(e.to_string()),
            })?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: 0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_vectorizer_is_stable_and_normalized() {
        let vectorizer = DeterministicVectorizer::new(64);
        let a = vectorizer.embed("fn handle_request").unwrap();
        let b = vectorizer.embed("fn handle_request").unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn different_text_produces_different_vector() {
        let vectorizer = DeterministicVectorizer::new(64);
        let a = vectorizer.embed("fn handle_request").unwrap();
        let b = vectorizer.embed("class Trainer").unwrap();
        assert_ne!(a, b);
    }
}
