//! Vector store (§4.E): an opaque-id-keyed index of unit-normalized vectors,
//! with brute-force cosine search, lazy-rebuild deletion, and a two-file
//! on-disk layout (vectors + id map) co-located with the relational store.
//!
//! The teacher's vector module ships a clustered IVFFlat index; the pack did
//! not retrieve its implementation files, only its public shape. Rather than
//! invent an unverified clustering scheme, this keeps the same façade
//! (`VectorStore`, id-keyed, save/load as a file pair) backed by a flat,
//! `rayon`-parallel cosine scan — correct and simple, and the natural
//! fallback the teacher's own doc comments describe scaling down to for
//! small corpora. See DESIGN.md.

use crate::error::VectorError;
use crate::types::{SymbolId, VectorId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

pub const VECTOR_DIMENSION_DEFAULT: usize = 384;

/// Rebuild the backing storage once tombstoned rows exceed this fraction of
/// the total (§4.E "rebuilding lazily").
const TOMBSTONE_REBUILD_THRESHOLD: f32 = 0.2;

#[derive(Debug)]
pub struct VectorStore {
    dimension: usize,
    inner: RwLock<Inner>,
    next_id: AtomicU32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    /// Row-major, `rows.len() / dimension` live or tombstoned vectors.
    rows: Vec<f32>,
    /// `vector_id` -> row index into `rows`.
    positions: HashMap<VectorId, usize>,
    symbol_of: HashMap<VectorId, SymbolId>,
    tombstoned: std::collections::HashSet<usize>,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn add_vector(&self, symbol_id: SymbolId, v: &[f32]) -> Result<VectorId, VectorError> {
        let ids = self.add_vectors_batch(&[symbol_id], std::slice::from_ref(&v.to_vec()))?;
        Ok(ids[0])
    }

    pub fn add_vectors_batch(&self, symbol_ids: &[SymbolId], vectors: &[Vec<f32>]) -> Result<Vec<VectorId>, VectorError> {
        let mut inner = self.inner.write().unwrap();
        let mut ids = Vec::with_capacity(vectors.len());

        for (symbol_id, v) in symbol_ids.iter().zip(vectors) {
            if v.len() != self.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
            let id = VectorId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let row = inner.rows.len() / self.dimension;
            inner.rows.extend(l2_normalize(v.clone()));
            inner.positions.insert(id, row);
            inner.symbol_of.insert(id, *symbol_id);
            ids.push(id);
        }

        Ok(ids)
    }

    /// Cosine-similarity top-k (inner product on normalized vectors).
    /// Empty store returns empty results, never an error (§4.E invariant).
    pub fn search(&self, query_v: &[f32], k: usize) -> Result<Vec<(f32, VectorId)>, VectorError> {
        if query_v.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: query_v.len(),
            });
        }
        let inner = self.inner.read().unwrap();
        if inner.positions.is_empty() {
            return Ok(Vec::new());
        }

        let query = l2_normalize(query_v.to_vec());
        let dim = self.dimension;

        let mut scored: Vec<(f32, VectorId)> = inner
            .positions
            .par_iter()
            .filter(|(_, &row)| !inner.tombstoned.contains(&row))
            .map(|(&id, &row)| {
                let start = row * dim;
                let vec_row = &inner.rows[start..start + dim];
                let score: f32 = vec_row.iter().zip(&query).map(|(a, b)| a * b).sum();
                (score, id)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);
        Ok(scored)
    }

    /// Tombstones `ids`; triggers a compacting rebuild once the tombstoned
    /// fraction crosses `TOMBSTONE_REBUILD_THRESHOLD` (§4.E).
    pub fn remove_vectors(&self, ids: &[VectorId]) {
        let mut inner = self.inner.write().unwrap();
        for id in ids {
            if let Some(row) = inner.positions.remove(id) {
                inner.tombstoned.insert(row);
                inner.symbol_of.remove(id);
            }
        }

        let total_rows = if self.dimension == 0 { 0 } else { inner.rows.len() / self.dimension };
        if total_rows > 0 && inner.tombstoned.len() as f32 / total_rows as f32 >= TOMBSTONE_REBUILD_THRESHOLD {
            self.rebuild(&mut inner);
        }
    }

    fn rebuild(&self, inner: &mut Inner) {
        let dim = self.dimension;
        let mut new_rows = Vec::with_capacity(inner.rows.len());
        let mut new_positions = HashMap::with_capacity(inner.positions.len());

        let mut by_row: Vec<(usize, VectorId)> = inner.positions.iter().map(|(&id, &row)| (row, id)).collect();
        by_row.sort_by_key(|(row, _)| *row);

        for (row, id) in by_row {
            let start = row * dim;
            let new_row = new_rows.len() / dim;
            new_rows.extend_from_slice(&inner.rows[start..start + dim]);
            new_positions.insert(id, new_row);
        }

        inner.rows = new_rows;
        inner.positions = new_positions;
        inner.tombstoned.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persists as a pair of files: `<path>.vectors` (bincode of `Inner`) and
    /// `<path>.meta` (dimension + next-id, so `load` can resume minting ids
    /// that never collide with what is already on disk).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), VectorError> {
        let path = path.as_ref();
        let inner = self.inner.read().unwrap();
        let vectors_path = vectors_path(path);
        let meta_path = meta_path(path);

        let encoded = bincode::serialize(&*inner)?;
        std::fs::write(&vectors_path, encoded).map_err(|source| VectorError::Persist {
            path: vectors_path.clone(),
            source,
        })?;

        let meta = StoreMeta {
            dimension: self.dimension,
            next_id: self.next_id.load(Ordering::SeqCst),
        };
        let encoded_meta = bincode::serialize(&meta)?;
        std::fs::write(&meta_path, encoded_meta).map_err(|source| VectorError::Persist {
            path: meta_path.clone(),
            source,
        })?;

        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VectorError> {
        let path = path.as_ref();
        let vectors_path = vectors_path(path);
        let meta_path = meta_path(path);

        let meta_bytes = std::fs::read(&meta_path).map_err(|source| VectorError::Load {
            path: meta_path.clone(),
            source,
        })?;
        let meta: StoreMeta = bincode::deserialize(&meta_bytes)?;

        let vector_bytes = std::fs::read(&vectors_path).map_err(|source| VectorError::Load {
            path: vectors_path.clone(),
            source,
        })?;
        let inner: Inner = bincode::deserialize(&vector_bytes)?;

        Ok(Self {
            dimension: meta.dimension,
            inner: RwLock::new(inner),
            next_id: AtomicU32::new(meta.next_id),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    dimension: usize,
    next_id: u32,
}

fn vectors_path(base: &Path) -> PathBuf {
    base.with_extension("vectors")
}

fn meta_path(base: &Path) -> PathBuf {
    base.with_extension("meta")
}

/// L2-normalizes `v` in place; a zero vector is returned unchanged rather
/// than dividing by zero.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sid(n: u32) -> SymbolId {
        SymbolId::new(n).unwrap()
    }

    #[test]
    fn empty_store_search_returns_empty_not_error() {
        let store = VectorStore::new(4);
        let result = store.search(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn add_and_search_finds_closest_vector() {
        let store = VectorStore::new(3);
        let id_a = store.add_vector(sid(1), &[1.0, 0.0, 0.0]).unwrap();
        store.add_vector(sid(2), &[0.0, 1.0, 0.0]).unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], 1).unwrap();
        assert_eq!(results[0].1, id_a);
    }

    #[test]
    fn vectors_are_l2_normalized_before_scoring() {
        let store = VectorStore::new(2);
        store.add_vector(sid(1), &[3.0, 4.0]).unwrap();
        let results = store.search(&[3.0, 4.0], 1).unwrap();
        assert!((results[0].0 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let store = VectorStore::new(3);
        let err = store.add_vector(sid(1), &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[test]
    fn remove_vectors_triggers_rebuild_past_threshold() {
        let store = VectorStore::new(2);
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(store.add_vector(sid(i + 1), &[i as f32, 1.0]).unwrap());
        }
        store.remove_vectors(&ids[0..3]);
        assert_eq!(store.len(), 7);
        // Surviving vectors are still searchable after the compacting rebuild.
        let results = store.search(&[9.0, 1.0], 1).unwrap();
        assert_eq!(results[0].1, ids[9]);
    }

    #[test]
    fn save_and_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index");

        let store = VectorStore::new(2);
        let id = store.add_vector(sid(1), &[1.0, 0.0]).unwrap();
        store.save(&path).unwrap();

        let loaded = VectorStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let results = loaded.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].1, id);
    }
}
