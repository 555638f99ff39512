//! Word-count chunking of document text.

use crate::models::Chunk;

/// Splits `text` on whitespace and regroups the words into runs of
/// `words_per_chunk`, joined by single spaces. Only the last run may be shorter.
///
/// Empty or all-whitespace input yields no chunks. A size of zero is treated as one.
pub fn chunk_text(text: &str, words_per_chunk: usize, source_document_id: &str) -> Vec<Chunk> {
    let size = words_per_chunk.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(size)
        .enumerate()
        .map(|(ordinal, run)| Chunk {
            ordinal,
            text: run.join(" "),
            source_document_id: source_document_id.to_string(),
        })
        .collect()
}
