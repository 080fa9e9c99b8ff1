//! Filter for chunks that are not worth embedding.

/// Minimum number of code lines for a chunk to count as meaningful on its own.
pub const MIN_CODE_LINES: usize = 3;

/// Substrings that mark a type or member declaration.
pub const STRUCTURAL_KEYWORDS: &[&str] = &[
    "class ",
    "interface ",
    "struct ",
    "enum ",
    "void ",
    "async ",
    "return ",
    "public ",
    "private ",
    "protected ",
];

/// Whether a chunk carries enough code to be embedded.
///
/// True when the chunk has at least [`MIN_CODE_LINES`] non-blank lines that
/// are not comments, or mentions any of [`STRUCTURAL_KEYWORDS`].
pub fn is_meaningful(text: &str) -> bool {
    code_line_count(text) >= MIN_CODE_LINES
        || STRUCTURAL_KEYWORDS.iter().any(|kw| text.contains(kw))
}

fn code_line_count(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment(line))
        .count()
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_only_chunk_is_dropped() {
        let text = "// header\n\n/* block\n * continues\n */\n// more\n";
        assert!(!is_meaningful(text));
    }

    #[test]
    fn test_blank_chunk_is_dropped() {
        assert!(!is_meaningful(""));
        assert!(!is_meaningful("\n   \n\t\n"));
    }

    #[test]
    fn test_three_code_lines_are_enough() {
        assert!(is_meaningful("a = 1;\nb = 2;\nc = a + b;"));
        assert!(!is_meaningful("a = 1;\nb = 2;"));
    }

    #[test]
    fn test_comments_do_not_count_as_code() {
        assert!(!is_meaningful("x();\n// y();\n// z();\ny();"));
    }

    #[test]
    fn test_structural_keyword_is_enough() {
        assert!(is_meaningful("public class Foo"));
        assert!(is_meaningful("    return x;"));
        assert!(is_meaningful("enum Color"));
    }

    #[test]
    fn test_keyword_needs_trailing_space() {
        // "classify" is not a class declaration
        assert!(!is_meaningful("classify(x);"));
    }
}
