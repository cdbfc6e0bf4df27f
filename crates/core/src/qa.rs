use crate::models::QaPair;

/// Extracts the first `Q:`/`A:` pair from a text blob. The question is the
/// remainder of the first trimmed line prefixed `Q:`, the answer the
/// remainder of the first line prefixed `A:`. Absence of either (or an empty
/// remainder after trimming) means the text is unstructured, not an error.
pub fn extract_qa(text: &str) -> Option<QaPair> {
    let question = first_prefixed_line(text, "Q:")?;
    let answer = first_prefixed_line(text, "A:")?;
    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(QaPair { question, answer })
}

fn first_prefixed_line(text: &str, prefix: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix(prefix))
        .map(|tail| tail.trim().to_string())
        .next()
}

/// Lazy single-pass scan over every well-formed `Q:`/`A:` pair in `text`.
/// A `Q:` line opens a capture; the scan then runs forward to the next `A:`
/// line for its answer. Another `Q:` line before an answer drops the dangling
/// question and opens a new capture. Pairs with an empty question or answer
/// after trimming are skipped.
pub fn qa_pairs(text: &str) -> QaPairs<'_> {
    QaPairs {
        lines: text.lines().collect(),
        position: 0,
    }
}

pub struct QaPairs<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl Iterator for QaPairs<'_> {
    type Item = QaPair;

    fn next(&mut self) -> Option<QaPair> {
        while self.position < self.lines.len() {
            let line = self.lines[self.position].trim();
            self.position += 1;

            let Some(question) = line.strip_prefix("Q:") else {
                continue;
            };
            let question = question.trim();

            let mut answer = "";
            while self.position < self.lines.len() {
                let line = self.lines[self.position].trim();
                if line.starts_with("Q:") {
                    break;
                }
                self.position += 1;
                if let Some(tail) = line.strip_prefix("A:") {
                    answer = tail.trim();
                    break;
                }
            }

            if !question.is_empty() && !answer.is_empty() {
                return Some(QaPair {
                    question: question.to_string(),
                    answer: answer.to_string(),
                });
            }
        }
        None
    }
}
