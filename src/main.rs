//! Entry point for the `clerk` CLI.
//!
//! ```sh
//! clerk init
//! clerk ingest products.json -i products
//! clerk ask "do you deliver on weekends?"
//! clerk chat -s alice
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use shopclerk::commands::{Cli, Commands};
use shopclerk::config::{ClerkConfig, load_config};
use shopclerk::document::load_feed;
use shopclerk::embedding::SentenceEmbedder;
use shopclerk::error::Result;
use shopclerk::faq::{FaqEntry, FaqTable};
use shopclerk::prompt::{ChatTemplate, load_template};
use shopclerk::retriever::Retriever;
use shopclerk::session::ChatSession;
use shopclerk::vector_store::VectorStore;
use shopclerk::{api, config_dir, ingest};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("clerk: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run()) {
        eprintln!("clerk: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init(),
        // Ingest builds an index from the feed alone; no config needed.
        Commands::Ingest { feed, index } => ingest_feed(&feed, &index).await,
        Commands::Ask {
            question,
            template,
            session,
        } => {
            let mut config = load_cli_config(cli.config.as_deref())?;
            if session.is_some() {
                config.session_name = session;
            }
            let template = load_template(template.as_deref().unwrap_or("support")).await?;
            let question = question
                .unwrap_or_else(|| "What can you help me with?".to_string());
            let (faq, retriever, mut session) = assemble_pipeline(&config)?;
            let reply = api::answer(&config, &template, &faq, &retriever, &mut session, &question)
                .await?;
            if !config.should_stream.unwrap_or(false) {
                println!("{reply}");
            }
            Ok(())
        }
        Commands::Chat { template, session } => {
            let mut config = load_cli_config(cli.config.as_deref())?;
            if session.is_some() {
                config.session_name = session;
            }
            let template = load_template(template.as_deref().unwrap_or("support")).await?;
            let (faq, retriever, mut session) = assemble_pipeline(&config)?;
            api::interactive_mode(&config, &template, &faq, &retriever, &mut session).await
        }
    }
}

/// Resolve and load the config file: `--config` when given, otherwise
/// `config.yaml` in the per-platform config directory.
fn load_cli_config(path: Option<&Path>) -> Result<ClerkConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => config_dir()?.join("config.yaml"),
    };
    debug!("loading config from {}", config_path.display());
    load_config(config_path.to_string_lossy().as_ref())
}

/// Build the FAQ table, the retriever with every configured index loaded,
/// and the session (persistent when a session name is set).
fn assemble_pipeline(
    config: &ClerkConfig,
) -> Result<(FaqTable, Retriever<SentenceEmbedder>, ChatSession)> {
    let faq = FaqTable::from_config(config);

    let embedder = SentenceEmbedder::load()?;
    let mut retriever = Retriever::new(embedder);
    for index in &config.indices {
        info!(name = %index.name, path = %index.path.display(), "loading index");
        retriever.add_index(VectorStore::load(&index.path)?);
    }

    let session = if config.session_name.is_some() {
        ChatSession::with_persistence(config.clone())?
    } else {
        ChatSession::new(config.clone())
    };

    Ok((faq, retriever, session))
}

/// Embed a JSON document feed and persist the resulting index next to the
/// configuration as `<name>_index.yaml`.
async fn ingest_feed(feed: &PathBuf, name: &str) -> Result<()> {
    let documents = load_feed(feed)?;
    info!(documents = documents.len(), "feed loaded");

    let embedder = SentenceEmbedder::load()?;
    let mut store = ingest::build_index(&embedder, documents, name)?;

    let path = config_dir()?.join(format!("{name}_index.yaml"));
    store.persist(&path)?;
    println!("indexed {} documents into {}", store.len(), path.display());
    Ok(())
}

/// Write a starter `config.yaml` and the default `support` template.
fn init() -> Result<()> {
    let config_dir = config_dir()?;
    let templates_dir = config_dir.join("templates");
    info!("creating {}", templates_dir.display());
    fs::create_dir_all(&templates_dir)?;

    let template_path = templates_dir.join("support.yaml");
    let template = ChatTemplate {
        system_prompt: "You are a friendly customer-support clerk for our shop. Answer using \
                        only the reference data below. If the reference data does not contain \
                        the answer, say you do not know and suggest contacting support."
            .to_string(),
        messages: vec![],
        pre_user_message_content: None,
        post_user_message_content: None,
    };
    fs::write(&template_path, serde_yaml::to_string(&template)?)?;
    info!("wrote {}", template_path.display());

    let config = ClerkConfig {
        api_key: "CHANGEME".to_string(),
        api_base: "https://openrouter.ai/api/v1".to_string(),
        model: "anthropic/claude-3-haiku".to_string(),
        context_max_tokens: 8192,
        assistant_minimum_context_tokens: 2048,
        should_stream: Some(true),
        top_k: 3,
        faq_match: Default::default(),
        faq: vec![
            FaqEntry {
                trigger: "contact support".to_string(),
                reply: "You can reach our support team at support@example.com.".to_string(),
            },
            FaqEntry {
                trigger: "opening hours".to_string(),
                reply: "We are open Monday to Friday, 09:00 to 18:00.".to_string(),
            },
            FaqEntry {
                trigger: "who are you".to_string(),
                reply: "I am the shop's support assistant. Ask me about our products and \
                        services!"
                    .to_string(),
            },
        ],
        session_db_url: config_dir.join("clerk.db").to_string_lossy().into_owned(),
        session_name: None,
        indices: vec![],
    };
    let config_path = config_dir.join("config.yaml");
    fs::write(&config_path, serde_yaml::to_string(&config)?)?;
    info!("wrote {}", config_path.display());

    println!("initialized configuration in {}", config_dir.display());
    Ok(())
}
