use crate::embeddings::{Embedder, NgramEmbedder};
use crate::error::SearchError;
use crate::models::{Chunk, Filter, ScoredChunk, SearchRequest};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use tokio::sync::RwLock;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

struct StoredEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Ephemeral in-memory index: brute-force cosine similarity over embedded
/// chunks. Backs tests and the no-infrastructure CLI mode.
pub struct MemoryIndex {
    entries: RwLock<Vec<StoredEntry>>,
    embedder: NgramEmbedder,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder: NgramEmbedder::default(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Infallible insert for test setup.
    pub async fn insert_chunks(&self, chunks: &[Chunk]) {
        let mut entries = self.entries.write().await;
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.text);
            if let Some(existing) = entries.iter_mut().find(|entry| entry.chunk.id == chunk.id) {
                existing.chunk = chunk.clone();
                existing.embedding = embedding;
            } else {
                entries.push(StoredEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn insert(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
        self.insert_chunks(chunks).await;
        Ok(())
    }

    async fn delete(&self, filter: &Filter) -> Result<(), SearchError> {
        let mut entries = self.entries.write().await;
        entries.retain(|entry| !filter.matches(&entry.chunk.metadata));
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>, SearchError> {
        let query_embedding = self.embedder.embed(&request.query);
        let entries = self.entries.read().await;

        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .filter(|entry| {
                request
                    .filter
                    .as_ref()
                    .map(|filter| filter.matches(&entry.chunk.metadata))
                    .unwrap_or(true)
            })
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&query_embedding, &entry.embedding) as f64,
            })
            .collect();

        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(request.top_k);
        Ok(scored)
    }
}
