mod in_memory;
mod qdrant;

use std::sync::Arc;

pub use in_memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;

use crate::domain::{ports::VectorStore, DomainError};
use crate::infrastructure::config::{VectorStoreBackend, VectorStoreConfig};

/// Opens the engine selected by `config.backend`. Collections are created
/// on first use with the embedding `dimension`.
pub async fn create_vector_store(
    config: &VectorStoreConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStore>, DomainError> {
    let store: Arc<dyn VectorStore> = match config.backend {
        VectorStoreBackend::Local => {
            Arc::new(InMemoryVectorStore::open(&config.db_dir, &config.collection).await?)
        }
        VectorStoreBackend::Qdrant => Arc::new(
            QdrantVectorStore::new(&config.qdrant_url, &config.collection, dimension).await?,
        ),
    };

    tracing::info!(
        backend = ?config.backend,
        collection = store.collection(),
        "vector store ready"
    );
    Ok(store)
}
