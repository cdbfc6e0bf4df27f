use crate::error::IngestError;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One source document, as the ingestion pipeline consumes it.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub file_name: String,
    pub content: String,
}

/// Recursively lists the regular files under `dir`, sorted by path. A
/// missing directory yields an empty list, not an error.
pub fn discover_corpus_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|item| item.ok()) {
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn load_corpus_files(dir: &Path) -> Result<Vec<CorpusFile>, IngestError> {
    let mut out = Vec::new();

    for path in discover_corpus_files(dir) {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path)?;
        out.push(CorpusFile {
            file_name: file_name.to_string(),
            content,
        });
    }

    Ok(out)
}

/// Label for a file: its name without the last extension.
pub fn doc_type_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}
