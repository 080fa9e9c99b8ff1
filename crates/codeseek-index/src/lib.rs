//! Semantic code search for codeseek.
//!
//! This crate provides:
//! - Block-aware line chunking driven by brace depth
//! - A relevance filter that keeps comment-only chunks out of the index
//! - Embedding generation via OpenAI-compatible endpoints, with a disabled
//!   mode when no credentials are configured
//! - An in-memory snippet index with per-session incremental indexing
//! - Cosine-similarity ranking and lexical scope paths for results

pub mod chunker;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod ignore_filter;
pub mod indexer;
pub mod relevance;
pub mod scope;
pub mod search;
pub mod snippet_index;

// Re-exports
pub use chunker::{Chunk, Chunker, ChunkerConfig, ChunkerError};
pub use embeddings::{EmbeddingBackend, EmbeddingError, EmbeddingProvider, HttpEmbeddings};
pub use engine::SearchEngine;
pub use error::EngineError;
pub use ignore_filter::{IgnoreFilter, DEFAULT_IGNORE_PATTERNS};
pub use indexer::{IndexStats, Indexer, IndexerConfig};
pub use relevance::is_meaningful;
pub use scope::resolve_scope;
pub use search::{cosine_similarity, rank, SearchHit};
pub use snippet_index::{CodeSnippet, SnippetIndex, SnippetKey};

/// Re-exported so callers can cancel indexing and search.
pub use tokio_util::sync::CancellationToken;
