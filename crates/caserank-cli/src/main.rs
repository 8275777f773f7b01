//! CLI entry point for the caserank backend (index builds, search, watch).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use caserank_core::{
    app_data_dir, get_docs_root, load_config, scan_documents, set_docs_root, status, Config,
    Engine, FsArtifactStore, OllamaClient,
};

#[derive(Parser)]
#[command(name = "caserank")]
#[command(about = "caserank: semantic search over a legal document corpus")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status and whether the corpus index is loadable.
    Status,
    /// Show where caserank stores its config and index artifacts.
    DataDir,
    /// Set the documents root directory used by build and watch.
    SetRoot {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Build the corpus index from a documents directory and publish it.
    Build {
        /// Root directory to scan (defaults to the configured docs root).
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Search the corpus index.
    Search {
        query: String,
        /// Number of results.
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Watch the documents directory and rebuild the index on changes.
    Watch {
        /// Root directory to watch (defaults to the configured docs root).
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            let config = load_config();
            println!("caserank backend");
            println!("  core: {}", status());
            match engine_from(&config) {
                Ok(engine) => match engine.load_corpus().await {
                    Ok(()) => {
                        let count = engine.corpus_document_count().await.unwrap_or(0);
                        println!("  corpus index: {count} document(s)");
                    }
                    Err(e) => println!("  corpus index: unavailable ({e})"),
                },
                Err(e) => println!("  engine: not configured ({e})"),
            }
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::SetRoot { path } => {
            set_docs_root(&path)?;
            println!("Documents root set to {}", path.display());
        }
        Commands::Build { path } => {
            let root = resolve_root(path)?;
            let config = load_config();
            let engine = engine_from(&config)?;
            let sources = scan_documents(&root)?;
            println!("Scanned {} source(s) under {}", sources.len(), root.display());
            let stats = engine.rebuild_corpus_index(sources).await?;
            println!(
                "Indexed {} document(s), dimension {}",
                stats.documents_processed, stats.vector_dimension
            );
        }
        Commands::Search { query, top_k, json } => {
            let config = load_config();
            let engine = engine_from(&config)?;
            let hits = engine.search_corpus(&query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No matches.");
            } else {
                for (i, hit) in hits.iter().enumerate() {
                    println!(
                        "{:>2}. {}  {:.2}%",
                        i + 1,
                        hit.document_name,
                        hit.similarity_percentage
                    );
                }
            }
        }
        Commands::Watch { path } => {
            let root = resolve_root(path)?;
            let config = load_config();
            let engine = Arc::new(engine_from(&config)?);
            println!("Watching {} (Ctrl+C to stop)", root.display());
            let handle = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || {
                caserank_core::watch_documents(&root, move |scan| match scan {
                    Ok(sources) => {
                        match handle.block_on(engine.rebuild_corpus_index(sources)) {
                            Ok(stats) => tracing::info!(
                                documents = stats.documents_processed,
                                "corpus index rebuilt"
                            ),
                            Err(e) => tracing::error!(error = %e, "rebuild failed"),
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "scan failed"),
                })
            })
            .await??;
        }
    }
    Ok(())
}

fn engine_from(config: &Config) -> Result<Engine, Box<dyn std::error::Error>> {
    config.validate()?;
    let embedder = OllamaClient::from_url(&config.ollama_url)?
        .with_embed_model(config.embed_model.clone())
        .with_dimension(config.embed_dimension);
    let store = FsArtifactStore::new(&config.store_dir()?)?;
    Ok(Engine::new(config, Arc::new(embedder), Arc::new(store)))
}

fn resolve_root(arg: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    arg.or_else(get_docs_root).ok_or_else(|| {
        "no documents root configured: pass PATH or run `caserank set-root <dir>`".into()
    })
}
