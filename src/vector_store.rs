//! Nearest-neighbor document index.
//!
//! Wraps a [HNSW](https://arxiv.org/abs/1603.09320) approximate
//! nearest-neighbor index (`hora` crate) and an ID → [`Document`] map. The
//! store is built once from a batch of documents, queried many times, and
//! never partially mutated: there is no delete or update path, only a full
//! rebuild via ingest.
//!
//! Persistence writes YAML metadata at the given path and dumps the index to
//! a sibling binary file named from a sha256-derived uuid of the store name.

use hora::core::ann_index::{ANNIndex, SerializableIndex};
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::document::Document;
use crate::error::{ClerkError, Result};

/// Read-only (after build) similarity index over crawled documents.
pub struct VectorStore {
    index: HNSWIndex<f32, usize>,
    name: String,
    dimension: usize,
    current_id: usize,
    id_to_document: HashMap<usize, Document>,
    uuid: u64,
}

/// Everything except the index itself; the index is dumped/reloaded as a
/// separate binary file keyed by `uuid`.
#[derive(Serialize, Deserialize)]
struct StoreMetadata {
    name: String,
    dimension: usize,
    current_id: usize,
    id_to_document: HashMap<usize, Document>,
    uuid: u64,
}

fn name_uuid(name: &str) -> u64 {
    let digest = sha256::digest(name);
    digest.as_bytes().iter().map(|b| *b as u64).sum()
}

fn index_file(metadata_path: &Path, uuid: u64) -> PathBuf {
    let dir = metadata_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{uuid}_hnsw_index.bin"))
}

impl VectorStore {
    /// Create an empty store. `name` seeds the uuid used to locate the
    /// persisted index file.
    pub fn new(dimension: usize, name: &str) -> Self {
        Self {
            index: HNSWIndex::new(dimension, &HNSWParams::default()),
            name: name.to_string(),
            dimension,
            current_id: 0,
            id_to_document: HashMap::new(),
            uuid: name_uuid(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.id_to_document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_document.is_empty()
    }

    /// Insert a vector and its document. Returns the assigned ID.
    ///
    /// Queries do not see the insert until [`build`](Self::build) runs.
    pub fn add_document(&mut self, vector: Vec<f32>, document: Document) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(ClerkError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let id = self.current_id;
        self.index
            .add(&vector, id)
            .map_err(|e| ClerkError::IndexUnavailable(e.to_string()))?;
        self.id_to_document.insert(id, document);
        self.current_id += 1;
        Ok(id)
    }

    /// Finalize the index. Must run after a batch of inserts and before any
    /// [`search`](Self::search).
    pub fn build(&mut self) -> Result<()> {
        self.index
            .build(Metric::Euclidean)
            .map_err(|e| ClerkError::IndexUnavailable(e.to_string()))
    }

    /// Return up to `top_k` documents ordered by ascending distance to
    /// `vector`. An empty store yields an empty result.
    pub fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<(Document, f32)>> {
        if vector.len() != self.dimension {
            return Err(ClerkError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if self.id_to_document.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for (node, distance) in self.index.search_nodes(vector, top_k) {
            if let Some(id) = node.idx() {
                if let Some(document) = self.id_to_document.get(id) {
                    hits.push((document.clone(), distance));
                }
            }
        }
        debug!(store = %self.name, hits = hits.len(), "index query");
        Ok(hits)
    }

    /// Write YAML metadata to `path` and dump the index binary next to it.
    pub fn persist(&mut self, path: &Path) -> Result<()> {
        let index_path = index_file(path, self.uuid);
        self.index
            .dump(index_path.to_string_lossy().as_ref())
            .map_err(|e| ClerkError::IndexUnavailable(e.to_string()))?;

        let metadata = StoreMetadata {
            name: self.name.clone(),
            dimension: self.dimension,
            current_id: self.current_id,
            id_to_document: self.id_to_document.clone(),
            uuid: self.uuid,
        };
        fs::write(path, serde_yaml::to_string(&metadata)?)?;
        Ok(())
    }

    /// Reload a persisted store. Fails with
    /// [`ClerkError::IndexUnavailable`] when either file is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ClerkError::IndexUnavailable(format!("{}: {e}", path.display())))?;
        let metadata: StoreMetadata = serde_yaml::from_str(&raw)?;

        let index_path = index_file(path, metadata.uuid);
        let index = HNSWIndex::load(index_path.to_string_lossy().as_ref())
            .map_err(|e| ClerkError::IndexUnavailable(format!("{}: {e}", index_path.display())))?;

        Ok(Self {
            index,
            name: metadata.name,
            dimension: metadata.dimension,
            current_id: metadata.current_id,
            id_to_document: metadata.id_to_document,
            uuid: metadata.uuid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text)
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let mut store = VectorStore::new(3, "test");
        store.add_document(vec![1.0, 0.0, 0.0], doc("east")).unwrap();
        store.add_document(vec![0.0, 1.0, 0.0], doc("north")).unwrap();
        store
            .add_document(vec![0.9, 0.1, 0.0], doc("mostly east"))
            .unwrap();
        store.build().unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0.text, "east");
        assert_eq!(hits[1].0.text, "mostly east");
        for pair in hits.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn search_returns_at_most_k() {
        let mut store = VectorStore::new(2, "test");
        for i in 0..5 {
            store
                .add_document(vec![i as f32, 0.0], doc(&format!("d{i}")))
                .unwrap();
        }
        store.build().unwrap();
        let hits = store.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_store_yields_empty_result() {
        let store = VectorStore::new(3, "empty");
        let hits = store.search(&[0.0, 0.0, 0.0], 3).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut store = VectorStore::new(3, "test");
        let err = store.add_document(vec![1.0], doc("bad")).unwrap_err();
        assert!(matches!(
            err,
            ClerkError::DimensionMismatch { expected: 3, got: 1 }
        ));
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq_index.yaml");

        let mut store = VectorStore::new(2, "faq");
        store
            .add_document(vec![0.0, 1.0], doc("Q: hours?").with_metadata("type", "faq"))
            .unwrap();
        store.add_document(vec![1.0, 0.0], doc("Q: refunds?")).unwrap();
        store.build().unwrap();
        store.persist(&path).unwrap();

        let reloaded = VectorStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.dimension(), 2);
        let hits = reloaded.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].0.text, "Q: hours?");
        assert_eq!(
            hits[0].0.metadata.get("type").map(String::as_str),
            Some("faq")
        );
    }

    #[test]
    fn load_missing_store_is_index_unavailable() {
        let err = VectorStore::load(Path::new("/nonexistent/store.yaml"))
            .err()
            .unwrap();
        assert!(matches!(err, ClerkError::IndexUnavailable(_)));
    }
}
