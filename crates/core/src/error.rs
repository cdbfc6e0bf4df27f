use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Index(#[from] SearchError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("completion stream interrupted: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
