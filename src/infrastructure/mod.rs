pub mod config;
pub mod embedding;
pub mod extract;
pub mod vector_store;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, SearchConfig, VectorStoreBackend,
    VectorStoreConfig,
};
pub use embedding::{create_embedding_service, LocalEmbedding, TextEmbedding};
pub use extract::{extract_text, ExtractError};
pub use vector_store::{create_vector_store, InMemoryVectorStore, QdrantVectorStore};

use crate::application::DocumentService;
use crate::domain::DomainError;

/// Wires the configured embedding provider and engine into a facade.
///
/// Opening the engine and loading the embedder happen here, once per process.
pub async fn build_document_service(config: &AppConfig) -> Result<DocumentService, DomainError> {
    let embedding = create_embedding_service(&config.embedding).await?;
    let vector_store = create_vector_store(&config.vector_store, embedding.dimension()).await?;
    Ok(DocumentService::new(
        embedding,
        vector_store,
        config.search.clone(),
    ))
}
