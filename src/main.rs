//! trirag CLI: build the triple-embedding index and query it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use trirag::answer::answer;
use trirag::config::TriragConfig;
use trirag::pipeline::{BuildResult, run_build};
use trirag::provider::{OllamaEmbedder, OllamaGenerator};
use trirag::retrieve::{QueryOptions, RetrievalEngine};
use trirag::{source, store};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "trirag.toml";

#[derive(Parser)]
#[command(name = "trirag", version, about = "Triple-embedding retrieval over relational data")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize the source, embed every triple and persist the index.
    Build,

    /// Retrieve the entities relevant to a query.
    Query {
        /// Natural-language query.
        text: String,

        /// Number of nearest triples to seed from.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Retrieve context and generate an answer.
    Ask {
        /// Natural-language question.
        text: String,
    },

    /// Show configuration and index statistics.
    Info,
}

fn load_config(path: Option<&Path>) -> Result<TriragConfig> {
    match path {
        Some(path) => Ok(TriragConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            Ok(TriragConfig::load(Path::new(DEFAULT_CONFIG))?)
        }
        None => Ok(TriragConfig::default()),
    }
}

fn open_engine(config: &TriragConfig) -> Result<RetrievalEngine> {
    let store = store::open(&config.store)?;
    let embedder = Arc::new(OllamaEmbedder::new(&config.embedding));
    Ok(RetrievalEngine::initialize(
        store.as_ref(),
        embedder,
        &config.retrieval,
    )?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hnsw_rs=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build => {
            let source = source::open(&config.source)?;
            let store = store::open(&config.store)?;
            let embedder = OllamaEmbedder::new(&config.embedding);

            let result = run_build(source.as_ref(), &embedder, store.as_ref(), &config);
            println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            if let BuildResult::Error { message } = result {
                miette::bail!("build failed: {message}");
            }
        }

        Commands::Query { text, k } => {
            let engine = open_engine(&config)?;
            let mut options = engine.default_options();
            if let Some(k) = k {
                options = QueryOptions { k, ..options };
            }
            let result = engine.retrieve_with(&text, &options)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else if result.is_empty() {
                println!("No entities found.");
            } else {
                println!(
                    "{} entities ({} seeds, {} expanded):",
                    result.entities.len(),
                    result.seed_count,
                    result.expanded_count
                );
                print!("{}", result.render_context());
            }
        }

        Commands::Ask { text } => {
            let engine = open_engine(&config)?;
            let generator = OllamaGenerator::new(&config.generation);
            let reply = answer(&engine, &generator, &config.retrieval, &text);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reply).into_diagnostic()?);
            } else {
                println!("{}", reply.text());
            }
        }

        Commands::Info => {
            println!("source:     {:?} {}", config.source.kind, config.source.path.display());
            println!("store:      {:?} {}", config.store.kind, config.store.path.display());
            println!(
                "embedding:  {} ({})",
                OllamaEmbedder::new(&config.embedding).model(),
                config.embedding.base_url
            );
            println!(
                "generation: {} ({})",
                OllamaGenerator::new(&config.generation).model(),
                config.generation.base_url
            );
            match open_engine(&config) {
                Ok(engine) => {
                    println!("entries:    {}", engine.len());
                    println!("dimension:  {}", engine.dim());
                    println!("graph:      {} triples", engine.graph().len());
                }
                Err(e) => println!("index:      unavailable ({e})"),
            }
        }
    }

    Ok(())
}
