//! Shopclerk: a retrieval-augmented customer-support assistant.
//!
//! The crate turns a feed of shop documents (FAQ answers, product
//! descriptions) into searchable vector indices, and answers customer
//! questions by retrieving the closest documents, assembling them into a
//! prompt, and asking an OpenAI-compatible completion endpoint — with an
//! FAQ fast path that answers common questions without any model call.
//!
//! Module map:
//!
//! - [`document`]: the document record and JSON feed loader.
//! - [`embedding`]: the [`embedding::Embedder`] trait and the bundled
//!   MiniLM sentence embedder.
//! - [`vector_store`]: HNSW index plus document payloads, persisted to
//!   disk.
//! - [`ingest`]: feed → embeddings → built index.
//! - [`retriever`]: multi-index nearest-neighbour lookup.
//! - [`faq`]: the exact/substring fast-path table.
//! - [`prompt`]: templates and the pure prompt assembler.
//! - [`completion`]: the HTTP client, whole and streamed.
//! - [`session`]: the append-only conversation transcript.
//! - [`api`]: the pipeline tying it all together.

use directories::ProjectDirs;
use std::path::PathBuf;

pub mod api;
pub mod commands;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod faq;
pub mod ingest;
pub mod message;
pub mod models;
pub mod prompt;
pub mod retriever;
pub mod schema;
pub mod session;
pub mod vector_store;

use crate::error::{ClerkError, Result};

/// The per-platform configuration directory for the application.
///
/// Configuration, templates, and persisted indices all live under here by
/// default. The directory is not created by this function.
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "shopclerk", "clerk")
        .ok_or_else(|| ClerkError::Config("unable to determine config directory".to_string()))?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
