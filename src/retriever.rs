//! Query-time retrieval across one or more vector indices.
//!
//! The retriever embeds the query once and asks every registered index for
//! its own top-k. Results are concatenated in registration order (e.g. all
//! FAQ hits, then all product hits); they are deliberately *not* merged into
//! a global top-k by distance. Keeping the per-index groups intact is the
//! documented policy inherited from running separate FAQ and product stores.

use tracing::debug;

use crate::document::Document;
use crate::embedding::Embedder;
use crate::error::{ClerkError, Result};
use crate::vector_store::VectorStore;

pub struct Retriever<E> {
    embedder: E,
    indices: Vec<VectorStore>,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            indices: Vec::new(),
        }
    }

    /// Register an index. Registration order fixes result order.
    pub fn add_index(&mut self, store: VectorStore) {
        self.indices.push(store);
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Retrieve up to `k` documents *per index* for `query`, nearest first
    /// within each index. `k` must be at least 1.
    ///
    /// Fails with [`ClerkError::IndexUnavailable`] when no index is
    /// registered and with [`ClerkError::Embedding`] when the query cannot
    /// be embedded. The indices themselves are never mutated.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>> {
        if k == 0 {
            return Err(ClerkError::Config(
                "retrieval depth must be at least 1".to_string(),
            ));
        }
        if self.indices.is_empty() {
            return Err(ClerkError::IndexUnavailable(
                "no vector index registered; run `clerk ingest` first".to_string(),
            ));
        }

        let vector = self.embedder.embed(query)?;

        let mut results = Vec::new();
        for store in &self.indices {
            let hits = store.search(&vector, k)?;
            debug!(index = store.name(), hits = hits.len(), "retrieved");
            results.extend(hits);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Returns a fixed unit vector per known word; counts calls so tests
    /// can assert the fast path never reaches the embedder.
    struct StubEmbedder {
        calls: Cell<usize>,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.set(self.calls.get() + 1);
            if text.trim().is_empty() {
                return Err(ClerkError::Embedding("empty input".to_string()));
            }
            let v = match text {
                "east" => vec![1.0, 0.0, 0.0],
                "north" => vec![0.0, 1.0, 0.0],
                _ => vec![0.5, 0.5, 0.0],
            };
            Ok(v)
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn store_with(name: &str, docs: &[(&str, [f32; 3])]) -> VectorStore {
        let mut store = VectorStore::new(3, name);
        for (text, v) in docs {
            store.add_document(v.to_vec(), Document::new(*text)).unwrap();
        }
        store.build().unwrap();
        store
    }

    #[test]
    fn returns_at_most_k_nearest_first() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(store_with(
            "faq",
            &[
                ("east doc", [1.0, 0.0, 0.0]),
                ("north doc", [0.0, 1.0, 0.0]),
                ("near east", [0.9, 0.1, 0.0]),
            ],
        ));

        let hits = retriever.retrieve("east", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.text, "east doc");
        assert_eq!(hits[1].0.text, "near east");
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn concatenates_indices_in_registration_order() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(store_with("faq", &[("faq hit", [1.0, 0.0, 0.0])]));
        retriever.add_index(store_with("products", &[("product hit", [0.99, 0.0, 0.0])]));

        // The product hit is closer, but faq results still come first: per
        // index top-k, no cross-index re-ranking.
        let hits = retriever.retrieve("east", 1).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.text, "faq hit");
        assert_eq!(hits[1].0.text, "product hit");
    }

    #[test]
    fn embeds_the_query_exactly_once() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(store_with("faq", &[("a", [1.0, 0.0, 0.0])]));
        retriever.add_index(store_with("products", &[("b", [0.0, 1.0, 0.0])]));

        retriever.retrieve("east", 3).unwrap();
        assert_eq!(retriever.embedder().calls.get(), 1);
    }

    #[test]
    fn empty_index_produces_empty_result() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(VectorStore::new(3, "empty"));

        let hits = retriever.retrieve("anything", 3).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn zero_retrieval_depth_is_rejected() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(store_with("faq", &[("a", [1.0, 0.0, 0.0])]));

        let err = retriever.retrieve("east", 0).unwrap_err();
        assert!(matches!(err, ClerkError::Config(_)));
        // Rejected before the query is embedded.
        assert_eq!(retriever.embedder().calls.get(), 0);
    }

    #[test]
    fn no_registered_index_is_an_error() {
        let retriever = Retriever::new(StubEmbedder::new());
        let err = retriever.retrieve("east", 1).unwrap_err();
        assert!(matches!(err, ClerkError::IndexUnavailable(_)));
    }

    #[test]
    fn empty_query_is_an_embedding_error() {
        let mut retriever = Retriever::new(StubEmbedder::new());
        retriever.add_index(store_with("faq", &[("a", [1.0, 0.0, 0.0])]));
        let err = retriever.retrieve("   ", 1).unwrap_err();
        assert!(matches!(err, ClerkError::Embedding(_)));
    }
}
