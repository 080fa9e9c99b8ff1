//! In-memory snippet store for one indexing session.
//!
//! Nothing here is persisted; the index lives as long as the engine that
//! owns it.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Unique location of a snippet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnippetKey {
    pub file_path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

/// An embedded chunk of a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    /// Canonical path of the source file
    pub file_path: PathBuf,
    /// Verbatim chunk text (not trimmed)
    pub content: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// End line (1-indexed, inclusive)
    pub end_line: usize,
    /// Embedding of `content`
    pub embedding: Vec<f32>,
}

impl CodeSnippet {
    pub fn key(&self) -> SnippetKey {
        SnippetKey {
            file_path: self.file_path.clone(),
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }
}

/// Snippets plus the bookkeeping that keeps indexing incremental.
///
/// `indexed_files` is a per-session memo, not a freshness check: a file in
/// it is never looked at again, even if it changed on disk. Files whose
/// indexing failed land in `abandoned_files` and are likewise not retried.
#[derive(Debug, Default, Clone)]
pub struct SnippetIndex {
    snippets: BTreeMap<SnippetKey, CodeSnippet>,
    indexed_files: HashSet<PathBuf>,
    abandoned_files: HashSet<PathBuf>,
}

impl SnippetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snippet, replacing any previous one with the same key.
    pub fn insert(&mut self, snippet: CodeSnippet) -> Option<CodeSnippet> {
        self.snippets.insert(snippet.key(), snippet)
    }

    pub fn get(&self, key: &SnippetKey) -> Option<&CodeSnippet> {
        self.snippets.get(key)
    }

    pub fn is_indexed(&self, path: &Path) -> bool {
        self.indexed_files.contains(path)
    }

    pub fn mark_indexed(&mut self, path: PathBuf) {
        self.abandoned_files.remove(&path);
        self.indexed_files.insert(path);
    }

    pub fn is_abandoned(&self, path: &Path) -> bool {
        self.abandoned_files.contains(path)
    }

    pub fn mark_abandoned(&mut self, path: PathBuf) {
        self.abandoned_files.insert(path);
    }

    /// Whether `path` has already been dealt with this session.
    pub fn is_settled(&self, path: &Path) -> bool {
        self.is_indexed(path) || self.is_abandoned(path)
    }

    /// Iterate snippets in key order.
    pub fn snippets(&self) -> impl Iterator<Item = &CodeSnippet> {
        self.snippets.values()
    }

    pub fn snippets_for_file<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Iterator<Item = &'a CodeSnippet> + 'a {
        self.snippets
            .values()
            .filter(move |snippet| snippet.file_path == path)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Number of files marked indexed.
    pub fn file_count(&self) -> usize {
        self.indexed_files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(path: &str, start: usize, end: usize, content: &str) -> CodeSnippet {
        CodeSnippet {
            file_path: PathBuf::from(path),
            content: content.to_string(),
            start_line: start,
            end_line: end,
            embedding: vec![1.0, 0.0],
        }
    }

    #[test]
    fn test_insert_overwrites_same_key() {
        let mut index = SnippetIndex::new();
        assert!(index.insert(snippet("/a.cs", 1, 10, "old")).is_none());
        let previous = index.insert(snippet("/a.cs", 1, 10, "new"));

        assert_eq!(previous.map(|s| s.content), Some("old".to_string()));
        assert_eq!(index.len(), 1);
        let key = SnippetKey {
            file_path: PathBuf::from("/a.cs"),
            start_line: 1,
            end_line: 10,
        };
        assert_eq!(index.get(&key).unwrap().content, "new");
    }

    #[test]
    fn test_snippets_iterate_in_key_order() {
        let mut index = SnippetIndex::new();
        index.insert(snippet("/b.cs", 1, 5, "b"));
        index.insert(snippet("/a.cs", 6, 9, "a2"));
        index.insert(snippet("/a.cs", 1, 5, "a1"));

        let order: Vec<&str> = index.snippets().map(|s| s.content.as_str()).collect();
        assert_eq!(order, vec!["a1", "a2", "b"]);
    }

    #[test]
    fn test_snippets_for_file() {
        let mut index = SnippetIndex::new();
        index.insert(snippet("/a.cs", 1, 5, "a1"));
        index.insert(snippet("/b.cs", 1, 5, "b"));

        let path = PathBuf::from("/a.cs");
        assert_eq!(index.snippets_for_file(&path).count(), 1);
    }

    #[test]
    fn test_file_bookkeeping() {
        let mut index = SnippetIndex::new();
        let a = PathBuf::from("/a.cs");
        let b = PathBuf::from("/b.cs");

        assert!(!index.is_settled(&a));
        index.mark_indexed(a.clone());
        index.mark_abandoned(b.clone());

        assert!(index.is_indexed(&a));
        assert!(!index.is_indexed(&b));
        assert!(index.is_abandoned(&b));
        assert!(index.is_settled(&a) && index.is_settled(&b));
        assert_eq!(index.file_count(), 1);
        assert!(index.is_empty());
    }
}
