//! Block-aware line chunking.
//!
//! Files are cut into overlapping line windows. A running brace depth keeps
//! boundaries out of the middle of a block, so a method or class is rarely
//! split across chunks without needing a language parser.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default target chunk size in lines.
pub const DEFAULT_CHUNK_LINES: usize = 200;

/// Default number of lines carried into the next chunk.
pub const DEFAULT_OVERLAP_LINES: usize = 20;

/// Errors for invalid chunker settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk})")]
    OverlapTooLarge { overlap: usize, chunk: usize },
}

/// Chunk size settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Target chunk size in lines
    pub chunk_lines: usize,
    /// Lines of the previous chunk that seed the next one
    pub overlap_lines: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_lines: DEFAULT_CHUNK_LINES,
            overlap_lines: DEFAULT_OVERLAP_LINES,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.chunk_lines == 0 {
            return Err(ChunkerError::ZeroChunkSize);
        }
        if self.overlap_lines >= self.chunk_lines {
            return Err(ChunkerError::OverlapTooLarge {
                overlap: self.overlap_lines,
                chunk: self.chunk_lines,
            });
        }
        Ok(())
    }
}

/// A contiguous slice of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Lines of the chunk joined with `\n`
    pub text: String,
    /// Start line (1-indexed)
    pub start_line: usize,
    /// End line (1-indexed, inclusive)
    pub end_line: usize,
}

/// Line-based chunker driven by brace depth.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, rejecting a zero chunk size or an overlap that
    /// would never let the buffer drain.
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunker with 200-line chunks and a 20-line overlap.
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `content` into chunks.
    ///
    /// A chunk is emitted once the brace depth is back to zero and either
    /// the buffer has reached the target size or the current line is not
    /// blank. Every emitted chunk seeds the next buffer with its last
    /// `overlap_lines` lines, and whatever is left at the end forms a final
    /// chunk.
    ///
    /// Line spans are derived from the chunk's position, not from where its
    /// lines actually came from: chunk `i` reports
    /// `min(i * chunk_lines, n - 1) + 1 ..= min((i + 1) * chunk_lines, n)`
    /// for a file of `n` lines.
    pub fn chunk(&self, content: &str) -> Vec<Chunk> {
        let total_lines = content.lines().count();
        let mut texts = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut depth: i64 = 0;

        for line in content.lines() {
            buffer.push(line);
            depth += brace_delta(line);

            if depth != 0 {
                continue;
            }

            if buffer.len() >= self.config.chunk_lines || !line.trim().is_empty() {
                texts.push(buffer.join("\n"));
                let keep = self.config.overlap_lines.min(buffer.len());
                buffer.drain(..buffer.len() - keep);
            }
        }

        if !buffer.is_empty() {
            texts.push(buffer.join("\n"));
        }

        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let (start_line, end_line) = self.line_span(index, total_lines);
                Chunk {
                    text,
                    start_line,
                    end_line,
                }
            })
            .collect()
    }

    fn line_span(&self, index: usize, total_lines: usize) -> (usize, usize) {
        let size = self.config.chunk_lines;
        let last = total_lines.saturating_sub(1);
        let start = index.saturating_mul(size).min(last) + 1;
        let end = index
            .saturating_add(1)
            .saturating_mul(size)
            .min(total_lines)
            .max(start);
        (start, end)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_chunker(chunk_lines: usize, overlap_lines: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_lines,
            overlap_lines,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_content() {
        assert!(Chunker::with_defaults().chunk("").is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            Chunker::new(ChunkerConfig {
                chunk_lines: 0,
                overlap_lines: 0
            })
            .unwrap_err(),
            ChunkerError::ZeroChunkSize
        );
        assert!(matches!(
            Chunker::new(ChunkerConfig {
                chunk_lines: 10,
                overlap_lines: 10
            }),
            Err(ChunkerError::OverlapTooLarge { .. })
        ));
    }

    #[test]
    fn test_block_is_not_split() {
        let source = "class A\n{\n    void M()\n    {\n    }\n}\n";
        let chunks = small_chunker(200, 0).chunk(source);

        // "class A" sits at depth zero and closes a chunk on its own; the
        // braced body is only released once the closing brace is seen.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "class A");
        assert_eq!(chunks[1].text, "{\n    void M()\n    {\n    }\n}");
    }

    #[test]
    fn test_overlap_seeds_next_chunk() {
        let source = "a;\nb;\nc;";
        let chunks = small_chunker(200, 1).chunk(source);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "a;");
        assert_eq!(chunks[1].text, "a;\nb;");
        assert_eq!(chunks[2].text, "b;\nc;");
        // Leftover overlap forms the final chunk
        assert_eq!(chunks[3].text, "c;");
    }

    #[test]
    fn test_blank_lines_wait_for_target_size() {
        let source = "{\n}\n\n\n\n";
        let chunks = small_chunker(3, 0).chunk(source);
        assert_eq!(chunks[0].text, "{\n}");
        // The three trailing blank lines only close once the buffer is full
        assert_eq!(chunks[1].text, "\n\n");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_unclosed_block_becomes_final_chunk() {
        let source = "fn open() {\n    let x = 1;\n    let y = 2;";
        let chunks = small_chunker(2, 0).chunk(source);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, source);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
    }

    #[test]
    fn test_line_spans_follow_chunk_index() {
        let source = (0..10).map(|i| format!("x{};", i)).collect::<Vec<_>>().join("\n");
        let chunks = small_chunker(4, 0).chunk(&source);

        assert_eq!(chunks.len(), 10);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 4));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (5, 8));
        assert_eq!((chunks[2].start_line, chunks[2].end_line), (9, 10));
        // Past the end of the file the span collapses onto the last line
        assert_eq!((chunks[9].start_line, chunks[9].end_line), (10, 10));
        for chunk in &chunks {
            assert!(chunk.start_line <= chunk.end_line);
            assert!(chunk.end_line <= 10);
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let source = "namespace N\n{\n    class C\n    {\n    }\n}\nint x = 1;\n// done\n";
        let chunker = small_chunker(3, 1);
        assert_eq!(chunker.chunk(source), chunker.chunk(source));
    }

    #[test]
    fn test_brace_delta() {
        assert_eq!(brace_delta("{ { }"), 1);
        assert_eq!(brace_delta("} }"), -2);
        assert_eq!(brace_delta("plain"), 0);
    }
}
