//! Documents produced by the crawler and stored in the vector index.
//!
//! The crawler is an external process; its only contract with this crate is
//! a feed of `(text, metadata)` pairs used to (re)build an index. Observed
//! metadata keys: `type` (`faq` | `product`), `category`, `source`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// One crawled snippet of FAQ or product text. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Load a crawler-produced feed: a JSON array of `{text, metadata}` pairs.
///
/// `metadata` may be omitted per entry. Timing and scheduling of the crawl
/// belong to the crawler; this is the whole contract.
pub fn load_feed(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)?;
    let documents: Vec<Document> = serde_json::from_str(&raw)?;
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_feed_with_and_without_metadata() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
  {{"text": "Q: How do I pay?\nA: We accept PX Pay.", "metadata": {{"type": "faq", "category": "payments"}}}},
  {{"text": "Oolong tea 39.00"}}
]"#
        )
        .unwrap();

        let docs = load_feed(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata.get("type").map(String::as_str), Some("faq"));
        assert!(docs[1].metadata.is_empty());
    }

    #[test]
    fn rejects_malformed_feed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_feed(file.path()).is_err());
    }
}
