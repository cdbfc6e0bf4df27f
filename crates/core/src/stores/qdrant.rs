use crate::embeddings::{Embedder, NgramEmbedder};
use crate::error::SearchError;
use crate::models::{Chunk, Filter, ScoredChunk, SearchRequest};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Qdrant-backed `VectorIndex` over its HTTP JSON API. Point ids are derived
/// from chunk ids, so re-inserting a chunk id overwrites the same point.
pub struct QdrantIndex {
    endpoint: String,
    collection: String,
    client: Client,
    embedder: NgramEmbedder,
}

impl QdrantIndex {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            embedder: NgramEmbedder::default(),
        }
    }

    /// Creates the collection if it does not exist yet (cosine distance,
    /// embedder dimensions). An already-existing collection is fine.
    pub async fn ensure_collection(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": {
                    "size": self.embedder.dimensions(),
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            return Ok(());
        }

        Err(SearchError::BackendResponse {
            backend: "qdrant".to_string(),
            details: response.status().to_string(),
        })
    }

    fn check_status(response: &reqwest::Response) -> Result<(), SearchError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            })
        }
    }
}

// Low 64 bits of sha256, deterministic per chunk id.
fn point_id(chunk_id: &str) -> u64 {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn filter_conditions(filter: &Filter) -> Value {
    match filter {
        // an empty filter matches every point
        Filter::MatchAll => json!({}),
        Filter::Eq { field, value } => json!({
            "must": [{ "key": field, "match": { "value": value } }]
        }),
        Filter::Ne { field, value } => json!({
            "must_not": [{ "key": field, "match": { "value": value } }]
        }),
    }
}

fn payload_for(chunk: &Chunk) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("id".to_string(), Value::String(chunk.id.clone()));
    payload.insert("text".to_string(), Value::String(chunk.text.clone()));
    for (key, value) in &chunk.metadata {
        payload.insert(key.clone(), Value::String(value.clone()));
    }
    payload
}

fn chunk_from_payload(payload: &Value) -> Chunk {
    let mut id = String::new();
    let mut text = String::new();
    let mut metadata = BTreeMap::new();

    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            let Some(value) = value.as_str() else { continue };
            match key.as_str() {
                "id" => id = value.to_string(),
                "text" => text = value.to_string(),
                _ => {
                    metadata.insert(key.clone(), value.to_string());
                }
            }
        }
    }

    Chunk { id, text, metadata }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn insert(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .map(|chunk| {
                json!({
                    "id": point_id(&chunk.id),
                    "vector": self.embedder.embed(&chunk.text),
                    "payload": payload_for(chunk),
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        Self::check_status(&response)
    }

    async fn delete(&self, filter: &Filter) -> Result<(), SearchError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "filter": filter_conditions(filter) }))
            .send()
            .await?;

        Self::check_status(&response)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>, SearchError> {
        let mut body = json!({
            "vector": self.embedder.embed(&request.query),
            "limit": request.top_k,
            "with_payload": true,
        });
        if let Some(filter) = &request.filter {
            body["filter"] = filter_conditions(filter);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&body)
            .send()
            .await?;

        Self::check_status(&response)?;

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let chunk = hit
                .pointer("/payload")
                .map(chunk_from_payload)
                .unwrap_or_else(|| Chunk {
                    id: String::new(),
                    text: String::new(),
                    metadata: BTreeMap::new(),
                });
            result.push(ScoredChunk { chunk, score });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{chunk_from_payload, filter_conditions, payload_for, point_id};
    use crate::models::{Chunk, Filter};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    #[test]
    fn point_ids_are_deterministic_and_distinct() {
        assert_eq!(point_id("faq.txt#qa0"), point_id("faq.txt#qa0"));
        assert_ne!(point_id("faq.txt#qa0"), point_id("faq.txt#qa1"));
    }

    #[test]
    fn filters_translate_to_must_and_must_not() {
        let eq = filter_conditions(&Filter::eq("doc_type", "faq"));
        assert_eq!(
            eq.pointer("/must/0/match/value").and_then(Value::as_str),
            Some("faq")
        );

        let ne = filter_conditions(&Filter::ne("doc_type", "faq"));
        assert_eq!(
            ne.pointer("/must_not/0/key").and_then(Value::as_str),
            Some("doc_type")
        );

        assert_eq!(filter_conditions(&Filter::MatchAll), json!({}));
    }

    #[test]
    fn payload_round_trips_through_a_chunk() {
        let mut metadata = BTreeMap::new();
        metadata.insert("doc_type".to_string(), "faq".to_string());
        metadata.insert("question".to_string(), "refund policy".to_string());
        let chunk = Chunk {
            id: "faq.txt#qa0".to_string(),
            text: "Q: refund policy\nA: 30 days".to_string(),
            metadata,
        };

        let rebuilt = chunk_from_payload(&Value::Object(payload_for(&chunk)));
        assert_eq!(rebuilt, chunk);
    }
}
