use crate::models::{Chunk, META_DOC_TYPE, META_FILE_NAME};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap_chars: 50,
        }
    }
}

impl ChunkingConfig {
    /// Profile for startup bulk ingestion: larger chunks, wider overlap.
    pub fn bulk() -> Self {
        Self {
            max_chars: 1500,
            overlap_chars: 100,
        }
    }
}

/// Splits `text` into chunks of at most `max_chars` characters, preferring
/// paragraph boundaries, then sentence boundaries, and only then raw
/// character windows with `overlap_chars` of overlap. A single token longer
/// than the bound is the one case where a window may cut mid-word.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let max = config.max_chars.max(1);

    let paragraphs = trimmed
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>();

    let mut chunks = Vec::new();
    for piece in accumulate(&paragraphs, max, "\n\n") {
        if char_count(&piece) <= max {
            chunks.push(piece);
            continue;
        }

        let sentences = split_sentences(&piece);
        let sentence_refs = sentences.iter().map(String::as_str).collect::<Vec<_>>();
        for sub in accumulate(&sentence_refs, max, " ") {
            if char_count(&sub) <= max {
                chunks.push(sub);
            } else {
                chunks.extend(char_windows(&sub, max, config.overlap_chars));
            }
        }
    }

    chunks
}

pub fn split_document(
    text: &str,
    doc_type: &str,
    file_name: &str,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    split_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            let mut metadata = BTreeMap::new();
            metadata.insert(META_DOC_TYPE.to_string(), doc_type.to_string());
            metadata.insert(META_FILE_NAME.to_string(), file_name.to_string());
            Chunk {
                id: format!("{file_name}#{index}"),
                text: piece,
                metadata,
            }
        })
        .collect()
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

fn accumulate(parts: &[&str], max: usize, separator: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    let separator_chars = char_count(separator);

    for part in parts {
        let part_chars = char_count(part);
        if current.is_empty() {
            current.push_str(part);
            current_chars = part_chars;
            continue;
        }

        if current_chars + separator_chars + part_chars <= max {
            current.push_str(separator);
            current.push_str(part);
            current_chars += separator_chars + part_chars;
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(part);
            current_chars = part_chars;
        }
    }

    if !current.is_empty() {
        out.push(current);
    }

    out
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut terminated = false;

    for ch in text.chars() {
        if terminated && ch.is_whitespace() {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
            terminated = false;
            continue;
        }
        current.push(ch);
        terminated = matches!(ch, '.' | '!' | '?');
    }

    let sentence = current.trim().to_string();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }

    sentences
}

fn char_windows(text: &str, max: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = max.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}
