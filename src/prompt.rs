//! Chat templates and prompt assembly.
//!
//! A template is a small YAML document holding the system instruction, an
//! optional list of seed turns, and optional text glued before/after every
//! user message. Templates live under `<config_dir>/templates/<name>.yaml`.
//!
//! ## Minimal YAML example
//!
//! ```yaml
//! system_prompt: "You are the store's support assistant."
//! messages:
//!   - role: "user"
//!     content: "hello"
//!   - role: "assistant"
//!     content: "Hi! How can I help?"
//! # pre_user_message_content: "Customer asks:"
//! # post_user_message_content: "Answer briefly."
//! ```

use serde::{Deserialize, Serialize};
use std::fs;

use crate::document::Document;
use crate::error::Result;
use crate::message::Turn;

/// Section header separating the instruction from retrieved context in the
/// system turn.
const REFERENCE_HEADER: &str = "Reference data:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTemplate {
    /// Instruction used as the session's system message.
    pub system_prompt: String,

    /// Seed turns inserted between the system turn and live conversation.
    #[serde(default)]
    pub messages: Vec<Turn>,

    /// Text prepended to each user message at send time.
    #[serde(default)]
    pub pre_user_message_content: Option<String>,

    /// Text appended to each user message at send time.
    #[serde(default)]
    pub post_user_message_content: Option<String>,
}

impl ChatTemplate {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            pre_user_message_content: None,
            post_user_message_content: None,
        }
    }
}

/// Load a template by name from `<config_dir>/templates/<name>.yaml`.
pub async fn load_template(name: &str) -> Result<ChatTemplate> {
    let path = crate::config_dir()?.join(format!("templates/{name}.yaml"));
    tracing::info!("loading template: {}", path.display());

    let content = fs::read_to_string(path)?;
    let template: ChatTemplate = serde_yaml::from_str(&content)?;
    Ok(template)
}

/// Assemble the full message list for one completion request.
///
/// Produces: one system turn (instruction plus the newline-joined text of
/// `context` in retrieval order), the template's seed turns, every prior
/// turn of `history` in chronological order, then the user turn carrying
/// `query` (decorated with the template's pre/post content).
///
/// Pure function: identical inputs yield identical output. When `context`
/// is empty the system turn carries an empty data section; the instruction
/// is expected to tell the model to admit it found nothing relevant rather
/// than invent an answer.
pub fn assemble(
    template: &ChatTemplate,
    context: &[Document],
    history: &[Turn],
    query: &str,
) -> Vec<Turn> {
    let context_block = context
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let system = format!(
        "{}\n\n{REFERENCE_HEADER}\n{}",
        template.system_prompt, context_block
    );

    let mut turns = Vec::with_capacity(template.messages.len() + history.len() + 2);
    turns.push(Turn::system(system));
    turns.extend(template.messages.iter().cloned());
    turns.extend(history.iter().cloned());

    let mut question = query.to_string();
    if let Some(pre) = &template.pre_user_message_content {
        question = format!("{pre} {question}");
    }
    if let Some(post) = &template.post_user_message_content {
        question = format!("{question} {post}");
    }
    turns.push(Turn::user(question));

    turns
}
