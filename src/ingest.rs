//! Index construction from a crawler feed.

use indicatif::ProgressBar;
use tracing::info;

use crate::document::Document;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;

/// Embed a batch of documents and build a queryable store from them.
///
/// This is the whole contract with the crawler side: it hands over a
/// sequence of documents, we hand back a built index.
pub fn build_index(
    embedder: &impl Embedder,
    documents: Vec<Document>,
    name: &str,
) -> Result<VectorStore> {
    let mut store = VectorStore::new(embedder.dimension(), name);

    let bar = ProgressBar::new(documents.len() as u64);
    for document in documents {
        let vector = embedder.embed(&document.text)?;
        store.add_document(vector, document)?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    store.build()?;
    info!(index = name, documents = store.len(), "index built");
    Ok(store)
}
