//! Overlapping text chunker
//!
//! Splits document text into chunks of bounded size with a fixed overlap
//! between neighbours. Within each window the cut lands on the coarsest
//! boundary available: paragraph runs, then paragraphs, lines, sentence
//! ends, clause ends, any whitespace, and as a last resort a raw cut at
//! the window edge. Chunks are exact substrings; sizes are measured in
//! characters so multi-byte text never splits inside a code point.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, Result};

/// Chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Hard upper bound on chunk length, in characters.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
    /// Hard cap on chunks per document; overflow is dropped, not an error.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
            max_chunks: default_max_chunks(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    1200
}

fn default_overlap_size() -> usize {
    150
}

fn default_max_chunks() -> usize {
    512
}

/// One produced chunk: exact substring plus its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// The chunk text, character-identical to the source slice.
    pub text: String,
    /// 0-based position among the document's chunks.
    pub index: usize,
    /// Character offset of the chunk start in the source text.
    pub start: usize,
}

// Boundary classes tried coarsest-first when choosing a cut.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    MultiParagraph,
    Paragraph,
    Line,
    Sentence,
    Clause,
    Whitespace,
}

const BOUNDARIES: [Boundary; 6] = [
    Boundary::MultiParagraph,
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Clause,
    Boundary::Whitespace,
];

impl Boundary {
    /// Whether a separator of this class ends exactly at `p` (exclusive).
    fn ends_at(&self, chars: &[char], p: usize) -> bool {
        match self {
            Boundary::MultiParagraph => {
                p >= 3 && chars[p - 3] == '\n' && chars[p - 2] == '\n' && chars[p - 1] == '\n'
            }
            Boundary::Paragraph => p >= 2 && chars[p - 2] == '\n' && chars[p - 1] == '\n',
            Boundary::Line => p >= 1 && chars[p - 1] == '\n',
            // Terminator must be followed by whitespace so "3.14" stays whole.
            Boundary::Sentence => {
                p >= 2
                    && chars[p - 1].is_whitespace()
                    && matches!(chars[p - 2], '.' | '!' | '?')
            }
            Boundary::Clause => {
                p >= 2
                    && chars[p - 1].is_whitespace()
                    && matches!(chars[p - 2], ',' | ';' | ':')
            }
            Boundary::Whitespace => p >= 1 && chars[p - 1].is_whitespace(),
        }
    }
}

/// Window-based splitter with guaranteed forward progress.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Builds a chunker, rejecting configs that could stall or produce
    /// empty chunks.
    pub fn from_config(config: &ChunkerConfig) -> Result<Self> {
        if config.max_chunk_size == 0 {
            return Err(EngineError::Config("max_chunk_size must be positive".to_string()));
        }
        if config.overlap_size >= config.max_chunk_size {
            return Err(EngineError::Config(format!(
                "overlap_size {} must be smaller than max_chunk_size {}",
                config.overlap_size, config.max_chunk_size
            )));
        }
        if config.max_chunks == 0 {
            return Err(EngineError::Config("max_chunks must be positive".to_string()));
        }
        Ok(Self { config: config.clone() })
    }

    /// Splits `text` into overlapping chunks. Whitespace-only input yields
    /// no chunks.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let overlap = self.config.overlap_size;
        let mut spans: Vec<ChunkSpan> = Vec::new();
        let mut start = 0usize;

        loop {
            if spans.len() == self.config.max_chunks {
                debug!(
                    dropped_from_char = start,
                    max_chunks = self.config.max_chunks,
                    "chunk cap reached, truncating remainder"
                );
                break;
            }
            let window_end = (start + self.config.max_chunk_size).min(n);
            if window_end == n {
                spans.push(make_span(&chars, start, n, spans.len()));
                break;
            }
            let cut = self.find_cut(&chars, start, window_end);
            spans.push(make_span(&chars, start, cut, spans.len()));
            // Invariant: cut > start + overlap, so the next start advances.
            start = cut - overlap;
        }
        spans
    }

    /// Picks the rightmost boundary of the coarsest class inside the
    /// window, or the window edge when none qualifies.
    ///
    /// A cut is only accepted beyond `start + overlap_size`; anything
    /// earlier would make the next chunk start at or before this one.
    fn find_cut(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let min_cut = start + self.config.overlap_size + 1;
        for boundary in BOUNDARIES {
            let mut p = window_end;
            while p >= min_cut {
                if boundary.ends_at(chars, p) {
                    return p;
                }
                p -= 1;
            }
        }
        window_end
    }
}

fn make_span(chars: &[char], start: usize, end: usize, index: usize) -> ChunkSpan {
    ChunkSpan {
        text: chars[start..end].iter().collect(),
        index,
        start,
    }
}
