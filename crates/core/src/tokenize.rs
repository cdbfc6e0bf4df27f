use std::collections::HashSet;

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ('\u{ac00}'..='\u{d7a3}').contains(&ch)
}

/// Lower-cases the input, keeps only Hangul syllables and ASCII
/// alphanumerics, and splits the rest into a token set. Duplicates
/// collapse; order is irrelevant. Total for any input.
pub fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|ch| if is_token_char(ch) { ch } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn overlap(left: &HashSet<String>, right: &HashSet<String>) -> usize {
    left.intersection(right).count()
}
