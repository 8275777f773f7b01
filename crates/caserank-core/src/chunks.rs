//! Splits document text into overlapping chunks for embedding and retrieval.
//!
//! Greedy packing: each chunk takes up to `max_chars` characters, then the
//! cursor backs up by `overlap` so consecutive chunks share a span across the
//! cut point.

use std::iter::FusedIterator;

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_CHARS: usize = 1000;
/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// A chunk of text from one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Identifier of the source document.
    pub document_id: String,
    /// Ordinal of this chunk within the document (0, 1, 2, …).
    pub index: usize,
}

/// Lazily chunk `text`. Yields nothing for empty or whitespace-only input;
/// input shorter than `max_chars` yields exactly one chunk equal to the whole
/// (trimmed) text. Chunks are never empty.
pub fn split<'a>(
    document_id: &'a str,
    text: &'a str,
    max_chars: usize,
    overlap: usize,
) -> ChunkIter<'a> {
    let max_chars = max_chars.max(1);
    ChunkIter {
        text: text.trim(),
        document_id,
        max_chars,
        // overlap >= max_chars would never advance the cursor
        overlap: overlap.min(max_chars - 1),
        pos: 0,
        index: 0,
        done: false,
    }
}

/// Iterator over the chunks of one document. Finite, single pass.
#[derive(Debug)]
pub struct ChunkIter<'a> {
    text: &'a str,
    document_id: &'a str,
    max_chars: usize,
    overlap: usize,
    pos: usize,
    index: usize,
    done: bool,
}

impl Iterator for ChunkIter<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            if self.done {
                return None;
            }
            let rest = &self.text[self.pos..];
            if rest.trim().is_empty() {
                self.done = true;
                return None;
            }

            // Byte length of the first max_chars characters of rest.
            let take = match rest.char_indices().nth(self.max_chars) {
                Some((i, _)) => i,
                None => {
                    self.done = true;
                    rest.len()
                }
            };
            let window = &rest[..take];

            if !self.done {
                // Advance so the next window re-reads the trailing `overlap`
                // characters of this one.
                let step = window
                    .char_indices()
                    .nth(self.max_chars - self.overlap)
                    .map(|(i, _)| i)
                    .unwrap_or(take);
                self.pos += step.max(1);
            }

            let trimmed = window.trim();
            if trimmed.is_empty() {
                continue;
            }
            let chunk = Chunk {
                text: trimmed.to_string(),
                document_id: self.document_id.to_string(),
                index: self.index,
            };
            self.index += 1;
            return Some(chunk);
        }
    }
}

impl FusedIterator for ChunkIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(document_id: &str, text: &str, max: usize, overlap: usize) -> Vec<String> {
        split(document_id, text, max, overlap)
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(texts("d", "", 100, 20).is_empty());
        assert!(texts("d", "   \n\t  ", 100, 20).is_empty());
    }

    #[test]
    fn short_input_is_one_whole_chunk() {
        let c = texts("d", "  One short paragraph.  ", 100, 20);
        assert_eq!(c, vec!["One short paragraph."]);
    }

    #[test]
    fn long_input_overlaps_across_cuts() {
        let text = "abcdefghij".repeat(30); // 300 chars, no whitespace
        let chunks = texts("d", &text, 100, 20);
        assert_eq!(chunks.len(), 4); // cursor steps by 80: 0, 80, 160, 240
        for pair in chunks.windows(2) {
            let tail = &pair[0][pair[0].len() - 20..];
            assert!(pair[1].starts_with(tail));
        }
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn chunk_ordinals_and_source_are_set() {
        let text = "xy".repeat(120); // 240 chars
        let chunks: Vec<Chunk> = split("brief.txt", &text, 100, 10).collect();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert_eq!(c.document_id, "brief.txt");
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "é".repeat(50);
        let chunks = texts("d", &text, 20, 5);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn oversized_overlap_is_clamped() {
        // overlap >= max_chars must still terminate
        let text = "abc".repeat(50);
        let chunks = texts("d", &text, 10, 10);
        assert!(chunks.len() > 1);
    }
}
