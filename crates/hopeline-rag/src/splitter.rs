//! Recursive character text splitting
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then characters). Pieces that are still too long
//! are split again with the finer separators, and short pieces are merged
//! back into chunks of at most `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of the previous chunk's tail.

use std::collections::VecDeque;

use hopeline_core::{DocumentChunk, Error, IndexingConfig, Result};

use crate::loader::LoadedPage;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text into overlapping chunks measured in characters
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split a text into non-empty, trimmed chunks in document order
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split loaded pages, keeping each chunk's page as its source
    pub fn split_pages(&self, pages: &[LoadedPage]) -> Vec<DocumentChunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .map(|text| DocumentChunk::new(text, page.source.clone()))
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }

            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces));
                short_pieces.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces));
        }

        chunks
    }

    /// Greedily merge short pieces into chunks, keeping an overlapping tail
    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        let config = IndexingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, attaching it to the start of every piece after the first
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let mut pieces = Vec::new();

    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|part| format!("{}{}", separator, part)));
    pieces.retain(|piece| !piece.is_empty());

    pieces
}

fn join_trimmed(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
