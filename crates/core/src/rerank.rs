use crate::models::ScoredChunk;
use crate::qa::extract_qa;
use crate::tokenize::{overlap, token_set};

/// Picks the candidate whose question text shares the most tokens with the
/// query and returns its answer (or its raw text when the chunk is not a
/// QA pair). Ties break to the first-encountered candidate. An empty
/// candidate list yields an empty string.
pub fn select_context(query: &str, candidates: &[ScoredChunk]) -> String {
    let query_tokens = token_set(query);

    let mut selected: Option<&ScoredChunk> = None;
    let mut best_score = 0usize;

    for candidate in candidates {
        let score = overlap(&query_tokens, &token_set(&question_text(candidate)));
        if selected.is_none() || score > best_score {
            selected = Some(candidate);
            best_score = score;
        }
    }

    let Some(candidate) = selected else {
        return String::new();
    };

    match extract_qa(&candidate.chunk.text) {
        Some(pair) => pair.answer,
        None => candidate.chunk.text.clone(),
    }
}

fn question_text(candidate: &ScoredChunk) -> String {
    if let Some(question) = candidate.chunk.question() {
        return question.to_string();
    }
    extract_qa(&candidate.chunk.text)
        .map(|pair| pair.question)
        .unwrap_or_default()
}
