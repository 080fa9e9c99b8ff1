//! The semantic search engine.
//!
//! [`SearchEngine`] owns one snippet index and wires the indexer and ranker
//! to the embedding backend. Clones share the same index, so a single
//! engine built at startup can be handed to every caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use codeseek_config::Config;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::{Chunker, ChunkerConfig};
use crate::embeddings::EmbeddingBackend;
use crate::error::EngineError;
use crate::ignore_filter::IgnoreFilter;
use crate::indexer::{IndexStats, Indexer, IndexerConfig};
use crate::search::{rank, SearchHit};
use crate::snippet_index::SnippetIndex;

/// Index-and-search entry point.
#[derive(Clone)]
pub struct SearchEngine {
    backend: EmbeddingBackend,
    indexer: Arc<Indexer>,
    index: Arc<RwLock<SnippetIndex>>,
    base_dir: PathBuf,
}

impl SearchEngine {
    /// Wire an engine from explicit parts.
    pub fn new(
        backend: EmbeddingBackend,
        chunker_config: ChunkerConfig,
        indexer_config: IndexerConfig,
        base_dir: &Path,
        ignore_patterns: &[String],
    ) -> Result<Self> {
        let chunker = Chunker::new(chunker_config).map_err(EngineError::from)?;
        let base_dir = std::fs::canonicalize(base_dir).unwrap_or_else(|_| base_dir.to_path_buf());
        let ignore_filter = IgnoreFilter::new(&base_dir, ignore_patterns)
            .context("Failed to build ignore filter")?;

        let index = Arc::new(RwLock::new(SnippetIndex::new()));
        let indexer = Indexer::new(indexer_config, chunker, ignore_filter, index.clone());

        Ok(Self {
            backend,
            indexer: Arc::new(indexer),
            index,
            base_dir,
        })
    }

    /// Build an engine from loaded configuration.
    ///
    /// Missing embedding credentials give a working engine in degraded mode.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = EmbeddingBackend::from_config(&config.embeddings);
        let chunker_config = ChunkerConfig {
            chunk_lines: config.index.chunk_lines,
            overlap_lines: config.index.overlap_lines,
        };
        let indexer_config = IndexerConfig {
            max_file_bytes: config.index.max_file_bytes,
            extensions: config.index.extensions.clone(),
        };

        Self::new(
            backend,
            chunker_config,
            indexer_config,
            &config.index.base_dir,
            &config.index.ignore_patterns,
        )
    }

    /// Index the given files.
    pub async fn index(&self, paths: &[PathBuf]) -> Result<IndexStats, EngineError> {
        self.index_with_cancel(paths, &CancellationToken::new()).await
    }

    /// Index the given files, stopping before the next file once `cancel`
    /// fires.
    ///
    /// Does nothing when semantic search is disabled.
    pub async fn index_with_cancel(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<IndexStats, EngineError> {
        match &self.backend {
            EmbeddingBackend::Enabled(provider) => {
                self.indexer
                    .index_files(provider.as_ref(), paths, cancel)
                    .await
            }
            EmbeddingBackend::Disabled { reason } => {
                debug!("Skipping indexing of {} paths: {}", paths.len(), reason);
                Ok(IndexStats::default())
            }
        }
    }

    /// Expand `root` (a directory or a single file) and index what it holds.
    pub async fn index_directory(&self, root: &Path) -> Result<IndexStats, EngineError> {
        self.index_directory_with_cancel(root, &CancellationToken::new())
            .await
    }

    pub async fn index_directory_with_cancel(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<IndexStats, EngineError> {
        if !self.backend.is_enabled() {
            return Ok(IndexStats::default());
        }
        // Canonical so walked paths share the ignore filter's root prefix.
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|source| EngineError::Io {
                path: root.to_path_buf(),
                source,
            })?;

        let files = self.indexer.collect_files(&root);
        info!("Found {} files to index under {:?}", files.len(), root);
        self.index_with_cancel(&files, cancel).await
    }

    /// Return up to `top_k` snippets most similar to `query`, best first.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, EngineError> {
        self.search_with_cancel(query, top_k, &CancellationToken::new())
            .await
    }

    /// Like [`search`](Self::search), but abandons the whole search if
    /// `cancel` fires before ranking starts.
    ///
    /// Cancellation is the only error. Degraded mode, an empty index and a
    /// failed query embedding all produce an empty result.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>, EngineError> {
        let provider = match &self.backend {
            EmbeddingBackend::Enabled(provider) => provider,
            EmbeddingBackend::Disabled { .. } => return Ok(Vec::new()),
        };

        if top_k == 0 || self.index.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let embedded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = provider.embed(query) => result,
        };

        let query_vector = match embedded {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Failed to embed query: {:#}", e);
                return Ok(Vec::new());
            }
        };

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let index = self.index.read().await;
        let hits: Vec<SearchHit> = rank(&index, &query_vector, top_k)
            .into_iter()
            .map(|(snippet, score)| SearchHit::from_ranked(snippet, score, &self.base_dir))
            .collect();

        debug!("Search for {:?} returned {} hits", query, hits.len());
        Ok(hits)
    }

    /// Number of snippets in the index.
    pub async fn snippet_count(&self) -> usize {
        self.index.read().await.len()
    }

    /// Number of files indexed this session.
    pub async fn indexed_file_count(&self) -> usize {
        self.index.read().await.file_count()
    }

    /// Whether an embedding provider is configured.
    pub fn is_semantic_search_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        self.backend.disabled_reason()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Shared handle to the underlying index.
    pub fn snippet_index(&self) -> Arc<RwLock<SnippetIndex>> {
        self.index.clone()
    }
}
