//! Command-line interface for codeseek.
//!
//! The index lives in memory, so `search` and `interactive` index their
//! paths first and then query within the same process.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codeseek_config::Config;
use codeseek_index::{CancellationToken, EngineError, IndexStats, SearchEngine, SearchHit};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "codeseek")]
#[command(about = "Semantic search over a local codebase")]
#[command(version)]
pub struct Cli {
    /// Path to config file (default: ./codeseek.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index files or directories and report what was indexed
    Index {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Index paths, then run a single query
    Search {
        /// Natural-language or code query
        query: String,

        /// Files or directories to index (default: the configured base dir)
        #[arg(short, long = "path")]
        paths: Vec<PathBuf>,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Index paths once, then answer queries from a prompt
    Interactive {
        /// Files or directories to index (default: the configured base dir)
        #[arg(short, long = "path")]
        paths: Vec<PathBuf>,

        /// Maximum number of results per query
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

/// JSON shape of a search response.
#[derive(Debug, Serialize)]
pub struct SearchOutput<'a> {
    pub query: &'a str,
    pub results: &'a [SearchHit],
}

/// Parse arguments, load configuration and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let engine = SearchEngine::from_config(&config)?;
    if let Some(reason) = engine.disabled_reason() {
        warn!("Semantic search is disabled: {}", reason);
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match cli.command {
        Commands::Index { paths } => {
            let stats = index_paths(&engine, &paths, &cancel).await?;
            print_stats(&stats, cli.format)?;
        }
        Commands::Search {
            query,
            paths,
            top_k,
        } => {
            let paths = paths_or_base_dir(paths, &config);
            index_paths(&engine, &paths, &cancel).await?;
            let top_k = top_k.unwrap_or(config.search.default_top_k);
            let hits = engine.search_with_cancel(&query, top_k, &cancel).await?;
            print_hits(&query, &hits, cli.format)?;
        }
        Commands::Interactive { paths, top_k } => {
            let paths = paths_or_base_dir(paths, &config);
            let stats = index_paths(&engine, &paths, &cancel).await?;
            info!(
                "Indexed {} files ({} snippets)",
                stats.files_indexed,
                engine.snippet_count().await
            );
            let top_k = top_k.unwrap_or(config.search.default_top_k);
            interactive_loop(&engine, top_k, cli.format).await?;
        }
    }

    Ok(())
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "codeseek=debug,codeseek_cli=debug,codeseek_index=debug,codeseek_config=debug"
    } else {
        "codeseek=info,codeseek_cli=info,codeseek_index=info,codeseek_config=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}

fn paths_or_base_dir(paths: Vec<PathBuf>, config: &Config) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![config.index.base_dir.clone()]
    } else {
        paths
    }
}

/// Index every path, expanding directories, and sum the statistics.
async fn index_paths(
    engine: &SearchEngine,
    paths: &[PathBuf],
    cancel: &CancellationToken,
) -> Result<IndexStats, EngineError> {
    let mut total = IndexStats::default();
    for path in paths {
        debug!("Indexing {:?}", path);
        let stats = if path.is_dir() {
            engine.index_directory_with_cancel(path, cancel).await?
        } else {
            engine
                .index_with_cancel(std::slice::from_ref(path), cancel)
                .await?
        };
        total.merge(&stats);
    }
    Ok(total)
}

async fn interactive_loop(engine: &SearchEngine, top_k: usize, format: OutputFormat) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("codeseek> ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if matches!(query, "exit" | "quit") {
                    break;
                }
                let _ = editor.add_history_entry(query);

                let hits = engine.search(query, top_k).await?;
                print_hits(query, &hits, format)?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn print_stats(stats: &IndexStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Text => println!("{}", format_stats_text(stats)),
    }
    Ok(())
}

fn print_hits(query: &str, hits: &[SearchHit], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = SearchOutput {
                query,
                results: hits,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => println!("{}", format_hits_text(hits)),
    }
    Ok(())
}

pub fn format_stats_text(stats: &IndexStats) -> String {
    format!(
        "Indexed {} files ({} cached, {} ignored, {} too large, {} failed)\n\
         {} chunks, {} filtered, {} snippets added, {} embedding calls in {} ms",
        stats.files_indexed,
        stats.files_cached,
        stats.files_ignored,
        stats.files_too_large,
        stats.files_failed,
        stats.chunks_total,
        stats.chunks_filtered,
        stats.snippets_added,
        stats.embedding_calls,
        stats.duration_ms
    )
}

/// Number of snippet lines shown per hit in text output.
const PREVIEW_LINES: usize = 6;

pub fn format_hits_text(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results.".to_string();
    }

    let mut out = String::new();
    for (rank, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}:{}-{} ({:.1}%)",
            rank + 1,
            hit.file_path,
            hit.start_line,
            hit.end_line,
            hit.score
        ));
        if !hit.scope.is_empty() {
            out.push_str(&format!(" [{}]", hit.scope));
        }
        out.push('\n');
        for line in hit.content.lines().take(PREVIEW_LINES) {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}
