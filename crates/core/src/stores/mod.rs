pub mod memory;
pub mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
