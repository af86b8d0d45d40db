#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use tracing::{debug, warn};

/// Maximum chunk length, in characters
pub const CHUNK_SIZE: usize = 1000;
/// Maximum number of characters shared by adjacent chunks
pub const CHUNK_OVERLAP: usize = 200;

/// Separators tried in order: paragraphs, lines, words, then single characters
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunk of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// Index of this chunk within its document
    pub chunk_index: usize,
    /// Byte offset of the chunk within its document
    pub start_offset: usize,
}

/// Recursive character splitter.
///
/// Text is split on the coarsest separator it contains, pieces are merged
/// greedily up to `chunk_size` characters, and each new chunk starts with up to
/// `chunk_overlap` characters carried over from the end of the previous one.
/// Pieces that are still too long are split again with the next separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    /// # Panics
    /// If `chunk_overlap` is not smaller than `chunk_size`.
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(
            chunk_overlap < chunk_size,
            "chunk overlap ({}) must be smaller than chunk size ({})",
            chunk_overlap,
            chunk_size
        );
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks with their position in the text
    #[inline]
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let pieces = self.split_text(text);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0;
        for (chunk_index, content) in pieces.into_iter().enumerate() {
            let start_offset = text
                .get(search_from..)
                .and_then(|rest| rest.find(&content))
                .map_or_else(|| text.find(&content).unwrap_or(0), |pos| pos + search_from);
            search_from = next_char_boundary(text, start_offset + 1);

            chunks.push(TextChunk {
                content,
                chunk_index,
                start_offset,
            });
        }

        debug!(
            "Split {} characters into {} chunks",
            char_len(text),
            chunks.len()
        );
        chunks
    }

    /// Split `text` into chunk strings
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = choose_separator(text, separators);

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily join pieces into chunks, carrying the tail of each chunk into the next
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    push_joined(&mut chunks, &current);

                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(dropped) => total -= char_len(dropped),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        push_joined(&mut chunks, &current);
        chunks
    }
}

/// Pick the first separator present in `text`; the empty separator always matches
fn choose_separator<'a, 'b>(text: &str, separators: &'b [&'a str]) -> (&'a str, &'b [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split on `separator`, keeping it at the start of the piece that follows it.
/// The empty separator splits into single characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (index, _) in text.match_indices(separator) {
        if index > last {
            pieces.push(text[last..index].to_string());
        }
        last = index;
    }
    if last < text.len() {
        pieces.push(text[last..].to_string());
    }
    pieces
}

fn push_joined(chunks: &mut Vec<String>, pieces: &VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn next_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}
