use crate::error::{CompletionError, SearchError};
use crate::models::{Chunk, Filter, ScoredChunk, SearchRequest};
use crate::prompt::Prompt;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Incremental answer tokens, forwarded in arrival order. Dropping the
/// stream cancels the underlying subscription.
pub type AnswerStream = BoxStream<'static, Result<String, CompletionError>>;

#[async_trait]
pub trait VectorIndex {
    async fn insert(&self, chunks: &[Chunk]) -> Result<(), SearchError>;

    async fn delete(&self, filter: &Filter) -> Result<(), SearchError>;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>, SearchError>;
}

#[async_trait]
pub trait Completion {
    async fn stream(&self, prompt: &Prompt) -> Result<AnswerStream, CompletionError>;
}
