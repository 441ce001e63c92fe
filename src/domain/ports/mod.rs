mod embedding;
mod vector_store;

pub use embedding::EmbeddingService;
pub use vector_store::VectorStore;
