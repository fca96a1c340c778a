//! Command-line interface, parsed with `clap`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to the configuration file. Defaults to `config.yaml` in the
    /// per-platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a starter configuration and chat template.
    Init,

    /// Build a vector index from a JSON document feed.
    #[clap(name = "ingest")]
    Ingest {
        /// Path to a JSON array of `{text, metadata}` documents.
        feed: PathBuf,

        /// Index name; the index is written next to the config as
        /// `<name>_index.yaml`.
        #[arg(name = "index", short = 'i', default_value = "store")]
        index: String,
    },

    /// Ask a single question and print the reply.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to ask.
        question: Option<String>,

        #[arg(name = "template", short = 't')]
        template: Option<String>,

        #[arg(name = "session", short = 's')]
        session: Option<String>,
    },

    /// Chat interactively; type `exit` to quit.
    #[clap(name = "chat", alias = "c")]
    Chat {
        #[arg(name = "template", short = 't')]
        template: Option<String>,

        #[arg(name = "session", short = 's')]
        session: Option<String>,
    },
}
