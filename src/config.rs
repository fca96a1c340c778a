//! Application configuration.
//!
//! One YAML file drives the whole process: completion endpoint credentials,
//! token budgets, the FAQ fast-path table and its matching policy, and the
//! list of vector indices to load (declaration order is retrieval order).
//!
//! ```yaml
//! api_key: "CHANGEME"
//! api_base: "https://openrouter.ai/api/v1"
//! model: "anthropic/claude-3-haiku"
//! context_max_tokens: 8192
//! assistant_minimum_context_tokens: 2048
//! should_stream: true
//! top_k: 3
//! faq_match: exact
//! faq:
//!   - trigger: "opening hours"
//!     reply: "We are open Monday to Friday, 09:00 to 18:00."
//! session_db_url: "clerk.db"
//! indices:
//!   - name: faq
//!     path: /path/to/faq_index.yaml
//!   - name: products
//!     path: /path/to/products_index.yaml
//! ```

use diesel::{Connection, SqliteConnection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{ClerkError, Result};
use crate::faq::{FaqEntry, MatchPolicy};

fn default_top_k() -> usize {
    3
}

/// One persisted vector index to load at startup. Declaration order fixes
/// the order results are concatenated in.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct IndexConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ClerkConfig {
    /// Bearer token for the completion endpoint.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,

    /// Model identifier to request.
    pub model: String,

    // Context window of the model.
    pub context_max_tokens: u16,

    // Tokens reserved for the assistant's reply.
    pub assistant_minimum_context_tokens: i32,

    /// Stream the reply fragment by fragment instead of waiting for the
    /// whole response.
    #[serde(default)]
    pub should_stream: Option<bool>,

    /// Documents retrieved per index per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// FAQ fast-path matching policy.
    #[serde(default)]
    pub faq_match: MatchPolicy,

    /// FAQ fast-path entries, in declaration order.
    #[serde(default)]
    pub faq: Vec<FaqEntry>,

    // Session database url (SQLite).
    pub session_db_url: String,

    // Session name; persistence is enabled when set.
    #[serde(default)]
    pub session_name: Option<String>,

    /// Vector indices queried in declaration order.
    #[serde(default)]
    pub indices: Vec<IndexConfig>,
}

/// Load the configuration from a YAML file.
pub fn load_config(file: &str) -> Result<ClerkConfig> {
    let content = fs::read_to_string(file)?;
    let config: ClerkConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Open the session database.
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection> {
    SqliteConnection::establish(db_url)
        .map_err(|e| ClerkError::Config(format!("error connecting to {db_url}: {e}")))
}
