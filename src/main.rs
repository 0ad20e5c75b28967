//! # paragraph-qa CLI (`pqa`)
//!
//! Runs the ingestion and query handlers from the command line, or serves
//! them over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! pqa --config ./config/pqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pqa ingest --bucket <b> --key <k>` | Ingest one uploaded document |
//! | `pqa ingest --event <file>` | Ingest every object named in an S3 notification |
//! | `pqa ask "<question>"` | Answer a question from the indexed paragraphs |
//! | `pqa split <file>` | Show how a local document splits into paragraphs |
//! | `pqa serve` | Start the HTTP trigger server |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use paragraph_qa::config::{self, Config};
use paragraph_qa::extract::{content_type_for_key, extract_text};
use paragraph_qa::ingest::{self, split_paragraphs};
use paragraph_qa::models::{LexEvent, S3Event};
use paragraph_qa::query;
use paragraph_qa::server;
use paragraph_qa::traits::Clients;

/// paragraph-qa: paragraph ingestion and question answering.
#[derive(Parser)]
#[command(
    name = "pqa",
    about = "Ingest documents as searchable paragraphs and answer questions from them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest uploaded documents.
    ///
    /// Downloads each object, splits it into paragraphs, annotates every
    /// paragraph, and writes the raw and annotated records.
    Ingest {
        /// Bucket holding the document.
        #[arg(long, requires = "key", conflicts_with = "event")]
        bucket: Option<String>,

        /// Object key (not URL-encoded).
        #[arg(long, requires = "bucket")]
        key: Option<String>,

        /// Path to an S3 notification JSON file.
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Answer a question.
    Ask {
        /// The question. Omit when using `--event`.
        #[arg(conflicts_with = "event")]
        utterance: Option<String>,

        /// Path to a Lex fulfillment event JSON file.
        #[arg(long)]
        event: Option<PathBuf>,

        /// Print the full dialog response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Split a local document into paragraphs without calling any service.
    Split {
        /// Local document (.docx, .pdf, or text).
        path: PathBuf,

        /// Also show the segment after the last delimiter.
        #[arg(long)]
        include_trailing: bool,
    },

    /// Start the HTTP trigger server.
    Serve,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event file: {}", path.display()))
}

fn run_split(path: &Path, include_trailing: bool) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = extract_text(&bytes, content_type_for_key(&path.to_string_lossy()))
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;

    let paragraphs = split_paragraphs(&text, include_trailing);
    println!("{}: {} paragraph(s)", path.display(), paragraphs.len());
    for (i, p) in paragraphs.iter().enumerate() {
        let preview: String = p.trim().chars().take(80).collect();
        println!("  [{}] {} chars  {}", i, p.len(), preview);
    }
    Ok(())
}

/// Load the configuration and build the AWS-backed clients.
fn load_clients(path: &Path) -> Result<(Config, Clients)> {
    let cfg = config::load_config(path)?;
    let clients = Clients::from_config(&cfg)?;
    Ok((cfg, clients))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { bucket, key, event } => {
            let event = match (bucket, key, event) {
                (_, _, Some(path)) => read_json::<S3Event>(&path)?,
                (Some(bucket), Some(key), None) => S3Event::single(&bucket, &key),
                _ => bail!("ingest needs either --bucket and --key, or --event"),
            };
            let (cfg, clients) = load_clients(&cli.config)?;
            let report = ingest::handle_object_created(&cfg, &clients, &event).await?;
            println!("{}", ingest::SUCCESS_TOKEN);
            println!("  objects:    {}", report.objects);
            println!("  paragraphs: {}", report.paragraphs);
            if report.skipped > 0 {
                println!("  skipped:    {}", report.skipped);
            }
        }
        Commands::Ask {
            utterance,
            event,
            json,
        } => {
            let event = match (utterance, event) {
                (_, Some(path)) => read_json::<LexEvent>(&path)?,
                (Some(utterance), None) => LexEvent::from_utterance(&utterance),
                (None, None) => bail!("ask needs a question or --event"),
            };
            let (cfg, clients) = load_clients(&cli.config)?;
            let reply = query::handle_utterance(&cfg, &clients, &event).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.content());
            }
        }
        Commands::Split {
            path,
            include_trailing,
        } => {
            run_split(&path, include_trailing)?;
        }
        Commands::Serve => {
            let (cfg, clients) = load_clients(&cli.config)?;
            server::run_server(&cfg, clients).await?;
        }
    }

    Ok(())
}
