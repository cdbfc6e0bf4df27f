use clap::{Parser, Subcommand};
use futures::StreamExt;
use ragchat_core::{
    ingest_corpus, seed_ratings_file, ChatEngine, ChatQuery, Chunk, ChunkingConfig, Filter,
    IngestOptions, MemoryIndex, OpenAiCompletion, PromptTemplates, QdrantIndex, ScoredChunk,
    SearchError, SearchRequest, VectorIndex, DEFAULT_BATCH_SIZE, DEFAULT_SEARCH_TOP_K,
    DEFAULT_SEED_BATCH_SIZE,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragchat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector index backend ("qdrant" or "memory")
    #[arg(long, default_value = "qdrant")]
    index: String,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333", env = "RAGCHAT_QDRANT_URL")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "ragchat_chunks")]
    qdrant_collection: String,

    /// OpenAI-compatible completion API base URL
    #[arg(long, default_value = "https://api.openai.com/v1", env = "RAGCHAT_LLM_URL")]
    llm_url: String,

    /// Completion model name
    #[arg(long, default_value = "gpt-4o-mini", env = "RAGCHAT_MODEL")]
    model: String,

    /// API key for the completion endpoint
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Directory with system.txt / user.txt prompt templates
    #[arg(long)]
    templates: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a corpus folder into the vector index.
    Ingest {
        /// Folder with corpus files (QA-structured or free text).
        #[arg(long)]
        folder: String,
        /// Purge the entire index before inserting.
        #[arg(long, default_value_t = false)]
        delete_all: bool,
        /// Restrict ingestion (and purging) to these labels.
        #[arg(long)]
        label: Vec<String>,
        /// Chunks per insert call.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Use the bulk chunking profile (1500/100 instead of 500/50).
        #[arg(long, default_value_t = false)]
        bulk: bool,
    },
    /// Seed the index from a tab-separated ratings file.
    Seed {
        /// Path to the seed file (id, text, label columns, one header line).
        #[arg(long)]
        file: String,
        /// Rows per insert call.
        #[arg(long, default_value_t = DEFAULT_SEED_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Raw similarity search, no re-ranking.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of hits to return.
        #[arg(long, default_value_t = DEFAULT_SEARCH_TOP_K)]
        top_k: usize,
    },
    /// Ask a question and print the full answer.
    Ask {
        /// Question to answer from the indexed corpus.
        #[arg(long)]
        query: String,
        /// Candidates for the retrieval pass.
        #[arg(long)]
        top_k: Option<usize>,
        /// Restrict retrieval to one label.
        #[arg(long)]
        label: Option<String>,
    },
    /// Ask a question and stream the answer token by token.
    Chat {
        /// Question to answer from the indexed corpus.
        #[arg(long)]
        query: String,
        /// Candidates for the retrieval pass.
        #[arg(long)]
        top_k: Option<usize>,
        /// Restrict retrieval to one label.
        #[arg(long)]
        label: Option<String>,
    },
}

enum AnyIndex {
    Memory(MemoryIndex),
    Qdrant(QdrantIndex),
}

#[async_trait::async_trait]
impl VectorIndex for AnyIndex {
    async fn insert(&self, chunks: &[Chunk]) -> Result<(), SearchError> {
        match self {
            AnyIndex::Memory(index) => index.insert(chunks).await,
            AnyIndex::Qdrant(index) => index.insert(chunks).await,
        }
    }

    async fn delete(&self, filter: &Filter) -> Result<(), SearchError> {
        match self {
            AnyIndex::Memory(index) => index.delete(filter).await,
            AnyIndex::Qdrant(index) => index.delete(filter).await,
        }
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredChunk>, SearchError> {
        match self {
            AnyIndex::Memory(index) => index.search(request).await,
            AnyIndex::Qdrant(index) => index.search(request).await,
        }
    }
}

fn build_index(cli: &Cli) -> anyhow::Result<AnyIndex> {
    match cli.index.as_str() {
        "memory" => Ok(AnyIndex::Memory(MemoryIndex::new())),
        "qdrant" => Ok(AnyIndex::Qdrant(QdrantIndex::new(
            &cli.qdrant_url,
            &cli.qdrant_collection,
        ))),
        other => anyhow::bail!("unknown index backend: {other}"),
    }
}

async fn ensure_backend(cli: &Cli, index: &AnyIndex) -> anyhow::Result<()> {
    if let AnyIndex::Qdrant(qdrant) = index {
        qdrant
            .ensure_collection()
            .await
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
        info!(collection = %cli.qdrant_collection, "qdrant collection ready");
    }
    Ok(())
}

fn load_templates(cli: &Cli) -> anyhow::Result<PromptTemplates> {
    match &cli.templates {
        Some(dir) => Ok(PromptTemplates::from_dir(Path::new(dir))?),
        None => Ok(PromptTemplates::default()),
    }
}

fn validate(query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be blank");
    }
    if top_k == Some(0) {
        anyhow::bail!("top-k must be positive");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let index = build_index(&cli)?;
    let completion = OpenAiCompletion::new(&cli.llm_url, &cli.model, cli.api_key.clone());
    let templates = load_templates(&cli)?;

    match &cli.command {
        Command::Ingest {
            folder,
            delete_all,
            label,
            batch_size,
            bulk,
        } => {
            if *batch_size == 0 {
                anyhow::bail!("batch-size must be positive");
            }
            ensure_backend(&cli, &index).await?;

            let labels = if label.is_empty() {
                None
            } else {
                Some(label.iter().cloned().collect::<HashSet<_>>())
            };
            let options = IngestOptions {
                delete_all: *delete_all,
                labels,
                batch_size: *batch_size,
                chunking: if *bulk {
                    ChunkingConfig::bulk()
                } else {
                    ChunkingConfig::default()
                },
            };

            let count = ingest_corpus(&index, Path::new(folder), &options)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{count} chunks ingested from {folder}");
        }
        Command::Seed { file, batch_size } => {
            if *batch_size == 0 {
                anyhow::bail!("batch-size must be positive");
            }
            ensure_backend(&cli, &index).await?;

            let count = seed_ratings_file(&index, Path::new(file), *batch_size)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{count} chunks seeded from {file}");
        }
        Command::Search { query, top_k } => {
            validate(query, Some(*top_k))?;

            let request = SearchRequest {
                query: query.clone(),
                top_k: *top_k,
                filter: None,
            };
            let hits = index
                .search(&request)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for hit in hits {
                println!("score={:.4} id={}", hit.score, hit.chunk.id);
                println!("  {}", hit.chunk.text.replace('\n', "\n  "));
            }
        }
        Command::Ask {
            query,
            top_k,
            label,
        } => {
            validate(query, *top_k)?;

            let chat_query = ChatQuery {
                query: query.clone(),
                top_k: *top_k,
                label: label.clone(),
            };
            let engine = ChatEngine::new(index, completion, templates);
            let answer = engine
                .answer(&chat_query)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{answer}");
        }
        Command::Chat {
            query,
            top_k,
            label,
        } => {
            validate(query, *top_k)?;

            let chat_query = ChatQuery {
                query: query.clone(),
                top_k: *top_k,
                label: label.clone(),
            };
            let engine = ChatEngine::new(index, completion, templates);
            let mut stream = engine
                .stream(&chat_query)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let mut stdout = std::io::stdout();
            while let Some(token) = stream.next().await {
                let token = token.map_err(|error| anyhow::anyhow!(error.to_string()))?;
                stdout.write_all(token.as_bytes())?;
                stdout.flush()?;
            }
            println!();
        }
    }

    Ok(())
}
