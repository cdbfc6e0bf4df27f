use crate::chunking::ChunkingConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const META_DOC_TYPE: &str = "doc_type";
pub const META_FILE_NAME: &str = "file_name";
pub const META_QUESTION: &str = "question";
pub const META_ID: &str = "id";

pub const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
pub const DEFAULT_SEARCH_TOP_K: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Unit of text stored in the vector index. Chunks are immutable once
/// inserted; re-ingestion deletes and re-inserts rather than updating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    pub fn doc_type(&self) -> Option<&str> {
        self.metadata.get(META_DOC_TYPE).map(String::as_str)
    }

    pub fn question(&self) -> Option<&str> {
        self.metadata.get(META_QUESTION).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    pub query: String,
    pub top_k: Option<usize>,
    pub label: Option<String>,
}

impl ChatQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            label: None,
        }
    }
}

/// Metadata filter expression supported by every index backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    MatchAll,
    Eq { field: String, value: String },
    Ne { field: String, value: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::Eq { field, value } => {
                metadata.get(field).is_some_and(|found| found == value)
            }
            Filter::Ne { field, value } => {
                metadata.get(field).map(|found| found != value).unwrap_or(true)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delete_all: bool,
    pub labels: Option<HashSet<String>>,
    pub batch_size: usize,
    pub chunking: ChunkingConfig,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delete_all: false,
            labels: None,
            batch_size: DEFAULT_BATCH_SIZE,
            chunking: ChunkingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn match_all_accepts_everything() {
        assert!(Filter::MatchAll.matches(&metadata(&[])));
        assert!(Filter::MatchAll.matches(&metadata(&[("doc_type", "faq")])));
    }

    #[test]
    fn eq_requires_the_field_to_be_present() {
        let filter = Filter::eq("doc_type", "faq");
        assert!(filter.matches(&metadata(&[("doc_type", "faq")])));
        assert!(!filter.matches(&metadata(&[("doc_type", "manual")])));
        assert!(!filter.matches(&metadata(&[])));
    }

    #[test]
    fn ne_accepts_missing_fields() {
        let filter = Filter::ne("doc_type", "faq");
        assert!(!filter.matches(&metadata(&[("doc_type", "faq")])));
        assert!(filter.matches(&metadata(&[("doc_type", "manual")])));
        assert!(filter.matches(&metadata(&[])));
    }
}
