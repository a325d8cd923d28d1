use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::chunk::{Chunk, Document};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 1200 }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split a document into chunks on sentence boundaries, packing whole
    /// sentences up to `max_chars`. A single sentence longer than the limit
    /// is hard-cut at character boundaries.
    ///
    /// Chunks are non-overlapping, preserve document order, and concatenate
    /// back to the original text exactly. An empty document yields no chunks.
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        if doc.text.is_empty() {
            return Vec::new();
        }

        let max_chars = self.config.max_chars.max(1);

        // Sentence segments cover the full text with no gaps.
        let mut pieces: Vec<(usize, &str, usize)> = Vec::new();
        for (offset, sentence) in doc.text.split_sentence_bound_indices() {
            let char_count = sentence.chars().count();
            if char_count <= max_chars {
                pieces.push((offset, sentence, char_count));
            } else {
                pieces.extend(hard_cut(offset, sentence, max_chars));
            }
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0;
        let mut buffer_start = 0;

        for (offset, piece, piece_chars) in pieces {
            if !buffer.is_empty() && buffer_chars + piece_chars > max_chars {
                let span = (buffer_start, buffer_start + buffer.len());
                chunks.push(Chunk::new(
                    doc.id.clone(),
                    std::mem::take(&mut buffer),
                    span,
                    chunks.len(),
                ));
                buffer_chars = 0;
                buffer_start = offset;
            }

            buffer.push_str(piece);
            buffer_chars += piece_chars;
        }

        if !buffer.is_empty() {
            let span = (buffer_start, buffer_start + buffer.len());
            chunks.push(Chunk::new(doc.id.clone(), buffer, span, chunks.len()));
        }

        chunks
    }
}

/// Cut an oversized sentence into pieces of at most `max_chars` characters,
/// always at char boundaries.
fn hard_cut<'a>(base: usize, text: &'a str, max_chars: usize) -> Vec<(usize, &'a str, usize)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            pieces.push((base + start, &text[start..idx], count));
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        pieces.push((base + start, &text[start..], count));
    }

    pieces
}
