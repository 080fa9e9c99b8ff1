//! Incremental indexing of source files.
//!
//! The Indexer runs each file through the ignore filter, chunker, relevance
//! filter and embedding provider, then commits its snippets to the shared
//! [`SnippetIndex`]. A file is processed at most once per session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, Chunker};
use crate::embeddings::EmbeddingProvider;
use crate::error::EngineError;
use crate::ignore_filter::IgnoreFilter;
use crate::relevance::is_meaningful;
use crate::snippet_index::{CodeSnippet, SnippetIndex};

/// Maximum number of chunks sent in one embedding request.
pub const EMBEDDING_BATCH_SIZE: usize = 32;

/// Configuration for the indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Files larger than this are marked indexed without being read
    pub max_file_bytes: u64,
    /// Extensions picked up when expanding a directory
    pub extensions: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        let defaults = codeseek_config::IndexConfig::default();
        Self {
            max_file_bytes: defaults.max_file_bytes,
            extensions: defaults.extensions,
        }
    }
}

/// Statistics about an indexing operation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files chunked and committed to the index
    pub files_indexed: usize,
    /// Files already indexed (or abandoned) earlier in the session
    pub files_cached: usize,
    /// Files rejected by the ignore filter
    pub files_ignored: usize,
    /// Files over the size limit
    pub files_too_large: usize,
    /// Files that failed to read or embed
    pub files_failed: usize,
    /// Chunks produced by the chunker
    pub chunks_total: usize,
    /// Chunks dropped by the relevance filter
    pub chunks_filtered: usize,
    /// New snippet keys written to the index
    pub snippets_added: usize,
    /// Number of embedding API calls
    pub embedding_calls: usize,
    /// Total time in milliseconds
    pub duration_ms: u64,
}

impl IndexStats {
    /// Add another run's counters to this one.
    pub fn merge(&mut self, other: &IndexStats) {
        self.files_indexed += other.files_indexed;
        self.files_cached += other.files_cached;
        self.files_ignored += other.files_ignored;
        self.files_too_large += other.files_too_large;
        self.files_failed += other.files_failed;
        self.chunks_total += other.chunks_total;
        self.chunks_filtered += other.chunks_filtered;
        self.snippets_added += other.snippets_added;
        self.embedding_calls += other.embedding_calls;
        self.duration_ms += other.duration_ms;
    }
}

/// Indexer that feeds the shared snippet index.
pub struct Indexer {
    config: IndexerConfig,
    chunker: Chunker,
    ignore_filter: IgnoreFilter,
    index: Arc<RwLock<SnippetIndex>>,
}

impl Indexer {
    pub fn new(
        config: IndexerConfig,
        chunker: Chunker,
        ignore_filter: IgnoreFilter,
        index: Arc<RwLock<SnippetIndex>>,
    ) -> Self {
        Self {
            config,
            chunker,
            ignore_filter,
            index,
        }
    }

    /// Index `paths`, skipping files already handled this session.
    ///
    /// A file that cannot be read or embedded is logged, counted in
    /// [`IndexStats::files_failed`] and not retried for the rest of the
    /// session; the remaining files are still processed. The token is checked
    /// before each file; files finished before cancellation stay indexed.
    pub async fn index_files(
        &self,
        provider: &dyn EmbeddingProvider,
        paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<IndexStats, EngineError> {
        let start = Instant::now();
        let mut stats = IndexStats::default();

        for raw_path in paths {
            if cancel.is_cancelled() {
                info!("Indexing cancelled after {} files", stats.files_indexed);
                return Err(EngineError::Cancelled);
            }

            let path = canonical(raw_path).await;

            if self.index.read().await.is_settled(&path) {
                debug!("Already indexed this session: {:?}", path);
                stats.files_cached += 1;
                continue;
            }

            if self.ignore_filter.should_ignore(&path) {
                debug!("Ignoring {:?}", path);
                stats.files_ignored += 1;
                continue;
            }

            match self.process_file(provider, &path, &mut stats).await {
                Ok(snippets) => {
                    let mut index = self.index.write().await;
                    for snippet in snippets {
                        // Chunks past the end of the file share a line span
                        // and overwrite each other.
                        if index.insert(snippet).is_none() {
                            stats.snippets_added += 1;
                        }
                    }
                    index.mark_indexed(path);
                    stats.files_indexed += 1;
                }
                Err(e) => {
                    warn!("Failed to index {:?}: {:#}", path, e);
                    stats.files_failed += 1;
                    self.index.write().await.mark_abandoned(path);
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!("Indexing complete: {:?}", stats);
        Ok(stats)
    }

    /// Read, chunk, filter and embed one file.
    ///
    /// Returns the file's snippets without touching the index, so a failure
    /// part way through leaves nothing behind.
    async fn process_file(
        &self,
        provider: &dyn EmbeddingProvider,
        path: &Path,
        stats: &mut IndexStats,
    ) -> Result<Vec<CodeSnippet>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| EngineError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if metadata.len() > self.config.max_file_bytes {
            debug!(
                "Skipping {:?}: {} bytes exceeds limit of {}",
                path,
                metadata.len(),
                self.config.max_file_bytes
            );
            stats.files_too_large += 1;
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| EngineError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let chunks = self.chunker.chunk(&content);
        let produced = chunks.len();
        stats.chunks_total += produced;

        let meaningful: Vec<Chunk> = chunks
            .into_iter()
            .filter(|chunk| is_meaningful(&chunk.text))
            .collect();
        stats.chunks_filtered += produced - meaningful.len();

        let mut snippets = Vec::with_capacity(meaningful.len());
        for batch in meaningful.chunks(EMBEDDING_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = provider.embed_batch(&texts).await?;
            stats.embedding_calls += 1;

            if embeddings.len() != batch.len() {
                anyhow::bail!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                );
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                snippets.push(CodeSnippet {
                    file_path: path.to_path_buf(),
                    content: chunk.text.clone(),
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    embedding,
                });
            }
        }

        debug!("Embedded {} snippets from {:?}", snippets.len(), path);
        Ok(snippets)
    }

    /// Collect indexable files under `root`.
    ///
    /// Honours `.gitignore` and the ignore filter, keeps only configured
    /// extensions, and returns paths in sorted order. A plain file is
    /// returned as-is.
    pub fn collect_files(&self, root: &Path) -> Vec<PathBuf> {
        if root.is_file() {
            return vec![root.to_path_buf()];
        }

        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .build()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file())
            .filter(|path| self.has_indexed_extension(path))
            .filter(|path| !self.ignore_filter.should_ignore(path))
            .collect();

        files.sort();
        debug!("Collected {} files under {:?}", files.len(), root);
        files
    }

    fn has_indexed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }
}

async fn canonical(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}
