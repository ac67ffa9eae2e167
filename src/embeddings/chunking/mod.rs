
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::{PageText, split_sentences};

/// A bounded-length passage of page text with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Session-wide emission order
    pub chunk_id: u64,
    pub document_id: u64,
    pub document_name: String,
    pub page_number: u32,
    pub text: String,
    /// Leading characters of `text` carried over from the previous passage
    #[serde(default)]
    pub overlap_chars: usize,
}

impl Passage {
    /// `text` without the carried-over prefix
    #[inline]
    pub fn fresh_text(&self) -> &str {
        let start = self
            .text
            .char_indices()
            .nth(self.overlap_chars)
            .map_or(self.text.len(), |(i, _)| i);
        self.text.get(start..).unwrap_or_default().trim_start()
    }
}

/// Configuration for passage chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Character budget per passage
    pub max_chars: usize,
    /// Trailing characters of a closed passage that seed the next one
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap: 150,
        }
    }
}

/// Chunker holding the session's chunk-id counter
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
    next_chunk_id: u64,
}

impl Chunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// Resume numbering at `next_chunk_id`
    #[inline]
    pub fn starting_at(config: ChunkingConfig, next_chunk_id: u64) -> Self {
        Self {
            config,
            next_chunk_id,
        }
    }

    #[inline]
    pub fn next_chunk_id(&self) -> u64 {
        self.next_chunk_id
    }

    /// Chunk every page of one document, assigning increasing chunk ids
    #[inline]
    pub fn chunk(
        &mut self,
        pages: &[PageText],
        document_id: u64,
        document_name: &str,
    ) -> Vec<Passage> {
        let mut passages = Vec::new();

        for page in pages {
            for (text, overlap_chars) in self.chunk_page(&page.text) {
                passages.push(Passage {
                    chunk_id: self.next_chunk_id,
                    document_id,
                    document_name: document_name.to_string(),
                    page_number: page.page_number,
                    text,
                    overlap_chars,
                });
                self.next_chunk_id += 1;
            }
        }

        debug!(
            "Chunked '{}' into {} passages over {} pages",
            document_name,
            passages.len(),
            pages.len()
        );

        passages
    }

    /// Greedy sentence packing for one page, returns `(text, overlap_chars)`
    fn chunk_page(&self, text: &str) -> Vec<(String, usize)> {
        let max_chars = self.config.max_chars;
        let mut chunks = Vec::new();
        let mut buffer = Buffer::default();

        for sentence in split_sentences(text) {
            let sentence_len = sentence.chars().count();

            if buffer.is_empty() {
                buffer.push(sentence, sentence_len);
                continue;
            }

            if buffer.len + 1 + sentence_len <= max_chars {
                buffer.push(sentence, sentence_len);
                continue;
            }

            // Shrink the carried tail so the seeded buffer stays within budget
            let room = max_chars.saturating_sub(sentence_len + 1);
            let closed = std::mem::take(&mut buffer);
            let tail = tail_chars(&closed.text, self.config.overlap.min(room));

            if !tail.is_empty() {
                let tail_len = tail.chars().count();
                buffer.push(tail, tail_len);
                buffer.overlap_chars = tail_len;
            }
            buffer.push(sentence, sentence_len);
            chunks.push((closed.text, closed.overlap_chars));
        }

        if !buffer.is_empty() {
            chunks.push((buffer.text, buffer.overlap_chars));
        }

        chunks
    }
}

#[derive(Debug, Default)]
struct Buffer {
    text: String,
    len: usize,
    overlap_chars: usize,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn push(&mut self, piece: &str, piece_len: usize) {
        if !self.text.is_empty() {
            self.text.push(' ');
            self.len += 1;
        }
        self.text.push_str(piece);
        self.len += piece_len;
    }
}

/// Last `count` characters of `text`, leading whitespace removed
fn tail_chars(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    let start = text
        .char_indices()
        .rev()
        .nth(count - 1)
        .map_or(0, |(i, _)| i);
    text.get(start..).unwrap_or_default().trim_start()
}

/// Chunk pages with a fresh counter starting at zero
#[inline]
pub fn chunk_pages(
    pages: &[PageText],
    document_id: u64,
    document_name: &str,
    config: &ChunkingConfig,
) -> Vec<Passage> {
    Chunker::new(config.clone()).chunk(pages, document_id, document_name)
}
