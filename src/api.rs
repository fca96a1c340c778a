//! The request pipeline: one customer question in, one assistant reply out.
//!
//! [`answer`] wires the stages together in a fixed order:
//!
//! 1. FAQ fast path. An exact (or substring, per config) trigger match
//!    short-circuits the pipeline and returns the canned reply without
//!    touching the embedder, the indices, or the network.
//! 2. Retrieval. The question is embedded once and every configured index
//!    is queried; results are concatenated in index registration order.
//! 3. Prompt assembly, a pure function over template, context, bounded
//!    history, and the question.
//! 4. Completion, streamed or whole per `should_stream`.
//! 5. State update. The user turn and the assistant turn are appended to
//!    the session only after the full reply is known, so a failed request
//!    leaves the transcript untouched.
//!
//! [`interactive_mode`] drives this loop over stdin; per-turn failures are
//! printed as the reply and the session keeps going.

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use futures::{Stream, StreamExt};
use std::io::{BufRead, Write, stdout};
use tracing::{debug, info};

use crate::completion::CompletionClient;
use crate::config::ClerkConfig;
use crate::document::Document;
use crate::embedding::Embedder;
use crate::error::{ClerkError, Result};
use crate::faq::FaqTable;
use crate::message::Turn;
use crate::prompt::{self, ChatTemplate};
use crate::retriever::Retriever;
use crate::session::ChatSession;

/// Write fragments to `out` as they arrive, flushing each one. Returns the
/// accumulated reply and the first failure instead of erroring out, so the
/// caller can restore terminal styling either way.
async fn drain_fragments<S, W>(stream: S, out: &mut W) -> (String, Option<ClerkError>)
where
    S: Stream<Item = Result<String>>,
    W: Write,
{
    futures::pin_mut!(stream);
    let mut reply = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(fragment) => {
                if let Err(e) = write!(out, "{fragment}").and_then(|_| out.flush()) {
                    return (reply, Some(ClerkError::Io(e)));
                }
                reply.push_str(&fragment);
            }
            Err(e) => return (reply, Some(e)),
        }
    }
    (reply, None)
}

/// Stream the reply to stdout fragment by fragment, returning the
/// concatenation. Fragments are flushed as they arrive so the user sees
/// the reply grow.
async fn stream_reply(client: &CompletionClient, turns: &[Turn]) -> Result<String> {
    let stream = client.complete_stream(turns).await?;

    let mut stdout = stdout();
    stdout.execute(SetForegroundColor(Color::Blue))?;
    stdout.execute(SetAttribute(Attribute::Bold))?;

    let (reply, failure) = drain_fragments(stream, &mut stdout).await;
    println!();

    // Restore styling even when the stream failed mid-reply.
    stdout.execute(SetAttribute(Attribute::Reset))?;
    stdout.execute(SetForegroundColor(Color::Reset))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(reply),
    }
}

/// Answer one customer question, updating the session transcript.
///
/// Returns the assistant reply (whether it came from the FAQ table or the
/// completion endpoint). On error nothing is appended to the session.
pub async fn answer<E: Embedder>(
    config: &ClerkConfig,
    template: &ChatTemplate,
    faq: &FaqTable,
    retriever: &Retriever<E>,
    session: &mut ChatSession,
    question: &str,
) -> Result<String> {
    if let Some(reply) = faq.lookup(question) {
        info!("faq fast path hit");
        let reply = reply.to_string();
        session.append(Turn::user(question))?;
        session.append(Turn::assistant(reply.clone()))?;
        return Ok(reply);
    }

    let hits = retriever.retrieve(question, config.top_k)?;
    debug!(documents = hits.len(), "retrieved context");
    let context: Vec<Document> = hits.into_iter().map(|(document, _)| document).collect();

    let turns = prompt::assemble(template, &context, &session.bounded_history(), question);

    let client = CompletionClient::new(config);
    let reply = if config.should_stream.unwrap_or(false) {
        stream_reply(&client, &turns).await?
    } else {
        client.complete(&turns).await?
    };

    session.append(Turn::user(question))?;
    session.append(Turn::assistant(reply.clone()))?;
    Ok(reply)
}

/// Read questions from stdin until the user types `exit`. A failed turn
/// prints the error as the reply and the loop continues.
pub async fn interactive_mode<E: Embedder>(
    config: &ClerkConfig,
    template: &ChatTemplate,
    faq: &FaqTable,
    retriever: &Retriever<E>,
    session: &mut ChatSession,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = stdout();

    loop {
        stdout.execute(SetForegroundColor(Color::Green))?;
        print!("> ");
        stdout.flush()?;
        stdout.execute(SetForegroundColor(Color::Reset))?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let question = input.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        match answer(config, template, faq, retriever, session, question).await {
            Ok(reply) => {
                if !config.should_stream.unwrap_or(false) {
                    println!("{reply}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    Ok(())
}
