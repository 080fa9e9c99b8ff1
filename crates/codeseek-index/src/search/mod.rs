//! Vector similarity ranking over the snippet index.
//!
//! Every snippet is scored against the query embedding by cosine similarity;
//! the top `k` are returned best first. Results are then shaped into
//! [`SearchHit`]s for callers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scope::resolve_scope;
use crate::snippet_index::{CodeSnippet, SnippetIndex};

/// A ranked search result as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// File path relative to the configured base directory
    pub file_path: String,
    /// Start line of the matched code
    pub start_line: usize,
    /// End line of the matched code
    pub end_line: usize,
    /// The matching code, trimmed
    pub content: String,
    /// Similarity as a percentage, rounded to one decimal
    pub score: f32,
    /// Dotted declaration path found in the snippet
    pub scope: String,
}

impl SearchHit {
    /// Shape a ranked snippet for display.
    pub fn from_ranked(snippet: &CodeSnippet, similarity: f32, base_dir: &Path) -> Self {
        Self {
            file_path: display_path(&snippet.file_path, base_dir),
            start_line: snippet.start_line,
            end_line: snippet.end_line,
            content: snippet.content.trim().to_string(),
            score: to_percentage(similarity),
            scope: resolve_scope(&snippet.content),
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Vectors of different length, with a zero norm, or with non-finite
/// components score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Score every snippet against `query` and keep the best `k`.
///
/// The sort is stable, so equal scores keep the index's key order.
pub fn rank<'a>(index: &'a SnippetIndex, query: &[f32], k: usize) -> Vec<(&'a CodeSnippet, f32)> {
    if k == 0 || index.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&CodeSnippet, f32)> = index
        .snippets()
        .map(|snippet| (snippet, cosine_similarity(query, &snippet.embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

/// Scale a similarity in `[-1, 1]` to a percentage with one decimal.
pub fn to_percentage(similarity: f32) -> f32 {
    (similarity * 1000.0).round() / 10.0
}

/// `path` relative to `base_dir` with `/` separators, or unchanged when it
/// lies outside `base_dir`.
pub fn display_path(path: &Path, base_dir: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn snippet(path: &str, start: usize, embedding: Vec<f32>) -> CodeSnippet {
        CodeSnippet {
            file_path: PathBuf::from(path),
            content: format!("  line {}\n", start),
            start_line: start,
            end_line: start + 1,
            embedding,
        }
    }

    fn sample_index() -> SnippetIndex {
        let mut index = SnippetIndex::new();
        index.insert(snippet("/repo/a.cs", 1, vec![1.0, 0.0]));
        index.insert(snippet("/repo/b.cs", 1, vec![0.0, 1.0]));
        index.insert(snippet("/repo/c.cs", 1, vec![0.7, 0.7]));
        index.insert(snippet("/repo/d.cs", 1, vec![-1.0, 0.0]));
        index
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_non_finite_scores_zero() {
        assert_eq!(cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[f32::INFINITY, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_with_infinite_embedding_stays_ordered() {
        let mut index = SnippetIndex::new();
        index.insert(snippet("/repo/a.cs", 1, vec![0.1, 1.0]));
        index.insert(snippet("/repo/b.cs", 1, vec![f32::INFINITY, 1.0]));
        index.insert(snippet("/repo/c.cs", 1, vec![1.0, 0.0]));
        index.insert(snippet("/repo/d.cs", 1, vec![0.5, 0.5]));

        let ranked = rank(&index, &[1.0, 0.0], 4);
        assert_eq!(ranked[0].0.file_path, PathBuf::from("/repo/c.cs"));
        assert_eq!(ranked[1].0.file_path, PathBuf::from("/repo/d.cs"));
        assert_eq!(ranked[3].0.file_path, PathBuf::from("/repo/b.cs"));
        for (_, score) in &ranked {
            assert!(score.is_finite());
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_rank_orders_descending() {
        let index = sample_index();
        let ranked = rank(&index, &[1.0, 0.0], 10);

        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].0.file_path, PathBuf::from("/repo/a.cs"));
        assert_eq!(ranked[1].0.file_path, PathBuf::from("/repo/c.cs"));
        assert_eq!(ranked[3].0.file_path, PathBuf::from("/repo/d.cs"));
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_rank_caps_results() {
        let index = sample_index();
        assert_eq!(rank(&index, &[1.0, 0.0], 2).len(), 2);
        assert!(rank(&index, &[1.0, 0.0], 0).is_empty());
        assert!(rank(&SnippetIndex::new(), &[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_rank_ties_keep_key_order() {
        let mut index = SnippetIndex::new();
        index.insert(snippet("/repo/z.cs", 1, vec![1.0, 0.0]));
        index.insert(snippet("/repo/a.cs", 1, vec![2.0, 0.0]));

        let ranked = rank(&index, &[1.0, 0.0], 2);
        assert_eq!(ranked[0].0.file_path, PathBuf::from("/repo/a.cs"));
        assert_eq!(ranked[1].0.file_path, PathBuf::from("/repo/z.cs"));
    }

    #[test]
    fn test_to_percentage() {
        assert_eq!(to_percentage(1.0), 100.0);
        assert_eq!(to_percentage(0.12345), 12.3);
        assert_eq!(to_percentage(0.0), 0.0);
        assert_eq!(to_percentage(-0.5), -50.0);
    }

    #[test]
    fn test_display_path() {
        let base = Path::new("/repo");
        assert_eq!(display_path(Path::new("/repo/src/a.cs"), base), "src/a.cs");
        assert_eq!(display_path(Path::new("/other/a.cs"), base), "/other/a.cs");
    }

    #[test]
    fn test_search_hit_from_ranked() {
        let snippet = CodeSnippet {
            file_path: PathBuf::from("/repo/src/Auth.cs"),
            content: "\n    class Auth\n    {\n        bool Validate(string u)\n".to_string(),
            start_line: 1,
            end_line: 4,
            embedding: vec![1.0],
        };
        let hit = SearchHit::from_ranked(&snippet, 0.87654, Path::new("/repo"));

        assert_eq!(hit.file_path, "src/Auth.cs");
        assert_eq!(hit.score, 87.7);
        assert_eq!(hit.scope, "Auth.Validate");
        assert!(hit.content.starts_with("class Auth"));
        assert!(hit.content.ends_with("bool Validate(string u)"));
    }
}
