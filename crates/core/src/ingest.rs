use crate::chunking::{split_document, split_text, ChunkingConfig};
use crate::corpus::{doc_type_of, load_corpus_files, CorpusFile};
use crate::error::IngestError;
use crate::models::{Chunk, Filter, IngestOptions, META_DOC_TYPE, META_FILE_NAME, META_QUESTION};
use crate::qa::qa_pairs;
use crate::traits::VectorIndex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_SEED_BATCH_SIZE: usize = 100;

/// Chunks one corpus file. Files containing `Q:`/`A:` pairs emit one chunk
/// per pair with the question mirrored into metadata; everything else falls
/// back to the boundary-aware splitter.
pub fn chunks_for_file(file: &CorpusFile, config: &ChunkingConfig) -> Vec<Chunk> {
    let doc_type = doc_type_of(&file.file_name);
    let pairs: Vec<_> = qa_pairs(&file.content).collect();

    if pairs.is_empty() {
        return split_document(&file.content, doc_type, &file.file_name, config);
    }

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, pair)| {
            let mut metadata = BTreeMap::new();
            metadata.insert(META_DOC_TYPE.to_string(), doc_type.to_string());
            metadata.insert(META_FILE_NAME.to_string(), file.file_name.clone());
            metadata.insert(META_QUESTION.to_string(), pair.question.clone());
            Chunk {
                id: format!("{}#qa{index}", file.file_name),
                text: format!("Q: {}\nA: {}", pair.question, pair.answer),
                metadata,
            }
        })
        .collect()
}

/// Ingests every file under `corpus_dir`. An empty or missing directory is
/// a successful no-op.
pub async fn ingest_corpus<V>(
    index: &V,
    corpus_dir: &Path,
    options: &IngestOptions,
) -> Result<usize, IngestError>
where
    V: VectorIndex + Sync,
{
    let files = load_corpus_files(corpus_dir)?;
    ingest_files(index, &files, options).await
}

/// The ingestion pipeline over pre-loaded files: purge (all, or per label),
/// parse each file, then insert in batches. Any batch-insert failure is
/// logged and reported as a count of 0; batches inserted before the failure
/// stay in the index, so a clean state is recovered by re-running with
/// `delete_all`.
pub async fn ingest_files<V>(
    index: &V,
    files: &[CorpusFile],
    options: &IngestOptions,
) -> Result<usize, IngestError>
where
    V: VectorIndex + Sync,
{
    let labels = options.labels.as_ref().filter(|labels| !labels.is_empty());

    if options.delete_all {
        index.delete(&Filter::MatchAll).await?;
        info!("purged all indexed chunks");
    } else if let Some(labels) = labels {
        for label in labels {
            index.delete(&Filter::eq(META_DOC_TYPE, label.clone())).await?;
        }
        info!(labels = labels.len(), "purged indexed chunks by label");
    }

    if files.is_empty() {
        info!("no corpus files found, nothing to ingest");
        return Ok(0);
    }

    let mut chunks = Vec::new();
    for file in files {
        if let Some(labels) = labels {
            if !labels.contains(doc_type_of(&file.file_name)) {
                continue;
            }
        }
        chunks.extend(chunks_for_file(file, &options.chunking));
    }

    if chunks.is_empty() {
        return Ok(0);
    }

    let batch_size = options.batch_size.max(1);
    let mut inserted = 0usize;
    for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
        if let Err(error) = index.insert(batch).await {
            error!(%error, batch = batch_index, inserted, "batch insert failed, reporting zero");
            return Ok(0);
        }
        inserted += batch.len();
    }

    info!(inserted, batch_size, "corpus ingestion complete");
    Ok(inserted)
}

/// Bootstrap seeding from a tab-separated ratings file: `id \t text \t
/// label`, one header line. The whole index is purged first. A missing file
/// is a successful no-op. Rows longer than the bulk chunk bound are split
/// with `{row_id}#{j}` ids.
pub async fn seed_ratings_file<V>(
    index: &V,
    path: &Path,
    batch_size: usize,
) -> Result<usize, IngestError>
where
    V: VectorIndex + Sync,
{
    if !path.exists() {
        info!(path = %path.display(), "no seed file, skipping");
        return Ok(0);
    }

    index.delete(&Filter::MatchAll).await?;

    let content = fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("ratings.txt")
        .to_string();
    let config = ChunkingConfig::bulk();

    let mut chunks = Vec::new();
    for line in content.lines().skip(1) {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 3 {
            continue;
        }
        let (row_id, text, label) = (columns[0], columns[1], columns[2]);

        let mut metadata = BTreeMap::new();
        metadata.insert(META_DOC_TYPE.to_string(), label.to_string());
        metadata.insert(META_FILE_NAME.to_string(), file_name.clone());

        if text.chars().count() <= config.max_chars {
            chunks.push(Chunk {
                id: row_id.to_string(),
                text: text.to_string(),
                metadata,
            });
        } else {
            for (piece_index, piece) in split_text(text, &config).into_iter().enumerate() {
                chunks.push(Chunk {
                    id: format!("{row_id}#{piece_index}"),
                    text: piece,
                    metadata: metadata.clone(),
                });
            }
        }
    }

    let batch_size = batch_size.max(1);
    let mut inserted = 0usize;
    for batch in chunks.chunks(batch_size) {
        index.insert(batch).await?;
        inserted += batch.len();
    }

    info!(inserted, path = %path.display(), "seed file loaded");
    Ok(inserted)
}

/// Ad-hoc insertion of caller-supplied documents. The metadata may carry an
/// `id`; otherwise a positional `doc#{index}` id is assigned. Unlike corpus
/// ingestion, failures propagate.
pub async fn insert_documents<V>(
    index: &V,
    documents: Vec<(String, BTreeMap<String, String>)>,
) -> Result<usize, crate::error::SearchError>
where
    V: VectorIndex + Sync,
{
    let chunks: Vec<Chunk> = documents
        .into_iter()
        .enumerate()
        .map(|(index, (text, metadata))| {
            let id = metadata
                .get(crate::models::META_ID)
                .cloned()
                .unwrap_or_else(|| format!("doc#{index}"));
            Chunk { id, text, metadata }
        })
        .collect();

    if chunks.is_empty() {
        return Ok(0);
    }

    index.insert(&chunks).await?;
    Ok(chunks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::stores::MemoryIndex;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingIndex {
        inserted: Mutex<Vec<Chunk>>,
        deletes: Mutex<Vec<Filter>>,
        insert_batches: Mutex<usize>,
        fail_inserts: bool,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn insert(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
            if self.fail_inserts {
                return Err(SearchError::Request("embedding backend down".to_string()));
            }
            *self.insert_batches.lock().unwrap() += 1;
            self.inserted.lock().unwrap().extend_from_slice(chunks);
            Ok(())
        }

        async fn delete(&self, filter: &Filter) -> Result<(), SearchError> {
            self.deletes.lock().unwrap().push(filter.clone());
            Ok(())
        }

        async fn search(
            &self,
            _request: &crate::models::SearchRequest,
        ) -> Result<Vec<crate::models::ScoredChunk>, SearchError> {
            Ok(Vec::new())
        }
    }

    fn qa_file() -> CorpusFile {
        CorpusFile {
            file_name: "faq.txt".to_string(),
            content: "Q: one?\nA: first\nQ: two?\nA: second\nQ: three?\nA: third\n".to_string(),
        }
    }

    #[test]
    fn qa_files_emit_one_chunk_per_pair() {
        let chunks = chunks_for_file(&qa_file(), &ChunkingConfig::default());

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "faq.txt#qa0");
        assert_eq!(chunks[1].id, "faq.txt#qa1");
        assert_eq!(chunks[2].id, "faq.txt#qa2");
        assert_eq!(chunks[0].text, "Q: one?\nA: first");
        assert_eq!(chunks[0].question(), Some("one?"));
        assert_eq!(chunks[0].doc_type(), Some("faq"));
    }

    #[test]
    fn unstructured_files_fall_back_to_the_splitter() {
        let file = CorpusFile {
            file_name: "guide.md".to_string(),
            content: "plain prose without any markers".to_string(),
        };
        let chunks = chunks_for_file(&file, &ChunkingConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "guide.md#0");
        assert!(chunks[0].question().is_none());
    }

    #[tokio::test]
    async fn delete_all_purges_before_inserting() {
        let index = RecordingIndex::default();
        let options = IngestOptions {
            delete_all: true,
            ..IngestOptions::default()
        };

        let count = ingest_files(&index, &[qa_file()], &options).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(index.deletes.lock().unwrap().as_slice(), &[Filter::MatchAll]);
    }

    #[tokio::test]
    async fn labels_purge_and_filter_the_corpus() {
        let index = RecordingIndex::default();
        let other = CorpusFile {
            file_name: "manual.txt".to_string(),
            content: "Q: skip?\nA: yes\n".to_string(),
        };
        let options = IngestOptions {
            labels: Some(HashSet::from(["faq".to_string()])),
            ..IngestOptions::default()
        };

        let count = ingest_files(&index, &[qa_file(), other], &options).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            index.deletes.lock().unwrap().as_slice(),
            &[Filter::eq(META_DOC_TYPE, "faq")]
        );
        let inserted = index.inserted.lock().unwrap();
        assert!(inserted.iter().all(|chunk| chunk.doc_type() == Some("faq")));
    }

    #[tokio::test]
    async fn insert_failure_degrades_to_zero() {
        let index = RecordingIndex {
            fail_inserts: true,
            ..RecordingIndex::default()
        };

        let count = ingest_files(&index, &[qa_file()], &IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn batch_size_bounds_each_insert_call() {
        let index = RecordingIndex::default();
        let options = IngestOptions {
            batch_size: 2,
            ..IngestOptions::default()
        };

        let count = ingest_files(&index, &[qa_file()], &options).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(*index.insert_batches.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_corpus_directory_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let index = RecordingIndex::default();

        let count = ingest_corpus(&index, dir.path(), &IngestOptions::default()).await?;

        assert_eq!(count, 0);
        assert!(index.inserted.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn reingestion_with_delete_all_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("faq.txt"), "Q: one?\nA: first\nQ: two?\nA: second\n")?;
        let index = MemoryIndex::new();
        let options = IngestOptions {
            delete_all: true,
            ..IngestOptions::default()
        };

        let first = ingest_corpus(&index, dir.path(), &options).await?;
        let second = ingest_corpus(&index, dir.path(), &options).await?;

        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(index.len().await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn seed_skips_header_and_short_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("ratings.txt");
        fs::write(
            &path,
            "id\ttext\tlabel\nr1\tgreat service\tpraise\nmalformed row\nr2\tslow refunds\tcomplaint\n",
        )?;
        let index = RecordingIndex::default();

        let count = seed_ratings_file(&index, &path, DEFAULT_SEED_BATCH_SIZE).await?;

        assert_eq!(count, 2);
        assert_eq!(index.deletes.lock().unwrap().as_slice(), &[Filter::MatchAll]);
        let inserted = index.inserted.lock().unwrap();
        assert_eq!(inserted[0].id, "r1");
        assert_eq!(inserted[0].doc_type(), Some("praise"));
        assert_eq!(inserted[1].text, "slow refunds");
        Ok(())
    }

    #[tokio::test]
    async fn seed_without_a_file_is_a_no_op() {
        let index = RecordingIndex::default();
        let count = seed_ratings_file(
            &index,
            Path::new("/nonexistent/ratings.txt"),
            DEFAULT_SEED_BATCH_SIZE,
        )
        .await
        .unwrap();

        assert_eq!(count, 0);
        assert!(index.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn adhoc_documents_get_positional_ids_unless_supplied() {
        let index = RecordingIndex::default();
        let mut with_id = BTreeMap::new();
        with_id.insert("id".to_string(), "custom".to_string());

        let count = insert_documents(
            &index,
            vec![
                ("first text".to_string(), BTreeMap::new()),
                ("second text".to_string(), with_id),
            ],
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        let inserted = index.inserted.lock().unwrap();
        assert_eq!(inserted[0].id, "doc#0");
        assert_eq!(inserted[1].id, "custom");
    }
}
