pub mod chat;
pub mod chunking;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod qa;
pub mod rerank;
pub mod retrieval;
pub mod stores;
pub mod tokenize;
pub mod traits;

pub use chat::{ChatEngine, RetrievedContext};
pub use chunking::{split_document, split_text, ChunkingConfig};
pub use corpus::{discover_corpus_files, doc_type_of, load_corpus_files, CorpusFile};
pub use embeddings::{Embedder, NgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ChatError, CompletionError, IngestError, SearchError};
pub use ingest::{
    chunks_for_file, ingest_corpus, ingest_files, insert_documents, seed_ratings_file,
    DEFAULT_SEED_BATCH_SIZE,
};
pub use llm::OpenAiCompletion;
pub use models::{
    ChatQuery, Chunk, Filter, IngestOptions, QaPair, ScoredChunk, SearchRequest,
    DEFAULT_BATCH_SIZE, DEFAULT_RETRIEVAL_TOP_K, DEFAULT_SEARCH_TOP_K, META_DOC_TYPE,
    META_FILE_NAME, META_ID, META_QUESTION,
};
pub use prompt::{build_prompt, ChatMessage, Prompt, PromptTemplates, Role};
pub use qa::{extract_qa, qa_pairs, QaPairs};
pub use rerank::select_context;
pub use retrieval::search_with_fallback;
pub use stores::{MemoryIndex, QdrantIndex};
pub use tokenize::{overlap, token_set};
pub use traits::{AnswerStream, Completion, VectorIndex};
