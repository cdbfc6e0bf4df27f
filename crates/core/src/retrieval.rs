use crate::error::SearchError;
use crate::models::{
    ChatQuery, Filter, ScoredChunk, SearchRequest, DEFAULT_RETRIEVAL_TOP_K, META_DOC_TYPE,
};
use crate::rerank::select_context;
use crate::traits::VectorIndex;
use tracing::debug;

/// Similarity search with one widening retry. When the primary pass returns
/// no candidates, or candidates whose selected context is blank, the search
/// is re-issued once with `top_k` doubled and the same label filter. The
/// trigger is emptiness of the context, never a score cutoff.
pub async fn search_with_fallback<V>(
    index: &V,
    query: &ChatQuery,
) -> Result<Vec<ScoredChunk>, SearchError>
where
    V: VectorIndex + Sync,
{
    let top_k = query.top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K);
    let filter = query
        .label
        .as_ref()
        .map(|label| Filter::eq(META_DOC_TYPE, label.clone()));

    let request = SearchRequest {
        query: query.query.clone(),
        top_k,
        filter: filter.clone(),
    };
    let candidates = index.search(&request).await?;

    if !context_is_blank(&query.query, &candidates) {
        return Ok(candidates);
    }

    let widened = SearchRequest {
        query: query.query.clone(),
        top_k: top_k * 2,
        filter,
    };
    debug!(top_k = widened.top_k, "primary retrieval blank, widening search");
    index.search(&widened).await
}

fn context_is_blank(query: &str, candidates: &[ScoredChunk]) -> bool {
    candidates.is_empty() || select_context(query, candidates).trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::search_with_fallback;
    use crate::models::{ChatQuery, Chunk, Filter, ScoredChunk, SearchRequest, META_DOC_TYPE};
    use crate::traits::VectorIndex;
    use crate::SearchError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct ScriptedIndex {
        responses: Mutex<Vec<Vec<ScoredChunk>>>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl ScriptedIndex {
        fn new(responses: Vec<Vec<ScoredChunk>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<SearchRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        async fn insert(&self, _chunks: &[Chunk]) -> Result<(), SearchError> {
            Ok(())
        }

        async fn delete(&self, _filter: &Filter) -> Result<(), SearchError> {
            Ok(())
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>, SearchError> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    fn hit(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: "hit#0".to_string(),
                text: text.to_string(),
                metadata: BTreeMap::new(),
            },
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn non_empty_primary_pass_is_not_retried() {
        let index = ScriptedIndex::new(vec![vec![hit("useful context")]]);
        let query = ChatQuery::new("anything");

        let candidates = search_with_fallback(&index, &query).await.unwrap();

        assert_eq!(candidates.len(), 1);
        let requests = index.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].top_k, 3);
    }

    #[tokio::test]
    async fn empty_primary_pass_triggers_exactly_one_doubled_retry() {
        let index = ScriptedIndex::new(vec![Vec::new(), Vec::new()]);
        let query = ChatQuery::new("anything");

        let candidates = search_with_fallback(&index, &query).await.unwrap();

        assert!(candidates.is_empty());
        let requests = index.recorded();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].top_k, 3);
        assert_eq!(requests[1].top_k, 6);
    }

    #[tokio::test]
    async fn blank_context_also_triggers_the_retry() {
        let index = ScriptedIndex::new(vec![vec![hit("   ")], vec![hit("second pass context")]]);
        let query = ChatQuery::new("anything");

        let candidates = search_with_fallback(&index, &query).await.unwrap();

        assert_eq!(candidates[0].chunk.text, "second pass context");
        assert_eq!(index.recorded().len(), 2);
    }

    #[tokio::test]
    async fn label_filter_is_preserved_across_the_retry() {
        let index = ScriptedIndex::new(vec![Vec::new(), Vec::new()]);
        let mut query = ChatQuery::new("anything");
        query.label = Some("faq".to_string());
        query.top_k = Some(4);

        search_with_fallback(&index, &query).await.unwrap();

        let requests = index.recorded();
        let expected = Some(Filter::eq(META_DOC_TYPE, "faq"));
        assert_eq!(requests[0].filter, expected);
        assert_eq!(requests[1].filter, expected);
        assert_eq!(requests[1].top_k, 8);
    }
}
