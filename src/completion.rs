//! Client for the remote completion endpoint.
//!
//! Speaks the OpenAI-compatible chat completions wire format: the message
//! list is POSTed as `{model, messages, stream}` with a bearer token, and a
//! streaming response arrives as server-sent-event lines terminated by a
//! literal `[DONE]` marker. Any non-success status is surfaced as
//! [`ClerkError::Completion`] carrying the raw status and body. Exactly one
//! attempt is made per call; there is no retry logic.

use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClerkConfig;
use crate::error::{ClerkError, Result};
use crate::message::Turn;

pub struct CompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

enum LineEvent {
    Fragment(String),
    Done,
    Skip,
}

/// Pop one newline-terminated line off the byte buffer, or `None` if no
/// complete line has arrived yet. Splitting happens on raw bytes so a
/// multi-byte code point straddling two network chunks stays intact in the
/// buffer until its line completes.
fn drain_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}

/// Decode one SSE line. Malformed data lines are skipped with a warning;
/// they never abort the stream.
fn decode_sse_line(line: &str) -> LineEvent {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        // Blank keep-alive lines and SSE comments.
        return LineEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return LineEvent::Done;
    }
    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => {
            let text: String = chunk
                .choices
                .iter()
                .filter_map(|c| c.delta.content.as_deref())
                .collect();
            if text.is_empty() {
                LineEvent::Skip
            } else {
                LineEvent::Fragment(text)
            }
        }
        Err(e) => {
            let err = ClerkError::StreamDecode(e.to_string());
            warn!("skipping malformed stream fragment: {err}");
            LineEvent::Skip
        }
    }
}

impl CompletionClient {
    pub fn new(config: &ClerkConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!(
                "{}/chat/completions",
                config.api_base.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Request a whole reply. Blocks (asynchronously) until the endpoint
    /// answers or fails.
    pub async fn complete(&self, turns: &[Turn]) -> Result<String> {
        debug!(endpoint = %self.endpoint, turns = turns.len(), "completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: turns,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClerkError::Completion {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let reply: String = parsed
            .choices
            .iter()
            .filter_map(|c| c.message.content.as_deref())
            .collect();
        Ok(reply)
    }

    /// Request a streamed reply: a lazy, finite, non-restartable sequence
    /// of text fragments. Concatenating the fragments in delivery order
    /// reconstructs the full reply.
    pub async fn complete_stream(
        &self,
        turns: &[Turn],
    ) -> Result<impl Stream<Item = Result<String>> + use<>> {
        debug!(endpoint = %self.endpoint, turns = turns.len(), "streaming completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: turns,
                stream: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ClerkError::Completion {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes_stream().boxed();
        let state = (bytes, Vec::<u8>::new(), false);

        Ok(futures::stream::unfold(
            state,
            |(mut bytes, mut buffer, done)| async move {
                if done {
                    return None;
                }
                loop {
                    while let Some(line) = drain_line(&mut buffer) {
                        match decode_sse_line(&line) {
                            LineEvent::Fragment(text) => {
                                return Some((Ok(text), (bytes, buffer, false)));
                            }
                            LineEvent::Done => return None,
                            LineEvent::Skip => continue,
                        }
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                        Some(Err(e)) => {
                            return Some((Err(ClerkError::Http(e)), (bytes, buffer, true)));
                        }
                        None => return None,
                    }
                }
            },
        ))
    }
}
