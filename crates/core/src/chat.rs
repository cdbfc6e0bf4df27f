use crate::error::{ChatError, SearchError};
use crate::models::{ChatQuery, ScoredChunk, SearchRequest};
use crate::prompt::{build_prompt, PromptTemplates};
use crate::rerank::select_context;
use crate::retrieval::search_with_fallback;
use crate::traits::{AnswerStream, Completion, VectorIndex};
use futures::StreamExt;
use tracing::debug;

pub struct RetrievedContext {
    pub candidates: Vec<ScoredChunk>,
    pub context: String,
}

/// Query-time engine: retrieve, re-rank, assemble the prompt, delegate to
/// the completion backend. Collaborators are injected by construction.
pub struct ChatEngine<V, C>
where
    V: VectorIndex,
    C: Completion,
{
    index: V,
    completion: C,
    templates: PromptTemplates,
}

impl<V, C> ChatEngine<V, C>
where
    V: VectorIndex + Send + Sync,
    C: Completion + Send + Sync,
{
    pub fn new(index: V, completion: C, templates: PromptTemplates) -> Self {
        Self {
            index,
            completion,
            templates,
        }
    }

    pub async fn retrieve(&self, query: &ChatQuery) -> Result<RetrievedContext, SearchError> {
        let candidates = search_with_fallback(&self.index, query).await?;
        let context = select_context(&query.query, &candidates);
        debug!(
            candidates = candidates.len(),
            context_chars = context.chars().count(),
            "context selected"
        );
        Ok(RetrievedContext { candidates, context })
    }

    /// Streams the answer token by token. A blank context after both
    /// retrieval passes still produces a prompt; the model decides how to
    /// respond.
    pub async fn stream(&self, query: &ChatQuery) -> Result<AnswerStream, ChatError> {
        let retrieved = self.retrieve(query).await?;
        let prompt = build_prompt(&self.templates, &query.query, &retrieved.context);
        Ok(self.completion.stream(&prompt).await?)
    }

    /// Collects the stream into a single materialized answer.
    pub async fn answer(&self, query: &ChatQuery) -> Result<String, ChatError> {
        let mut stream = self.stream(query).await?;
        let mut answer = String::new();
        while let Some(token) = stream.next().await {
            answer.push_str(&token?);
        }
        Ok(answer)
    }

    /// Raw similarity hits, no re-ranking and no fallback.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let request = SearchRequest {
            query: query.to_string(),
            top_k,
            filter: None,
        };
        self.index.search(&request).await
    }
}
