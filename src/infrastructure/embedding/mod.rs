mod local;
mod text;

use std::sync::Arc;

pub use local::LocalEmbedding;
pub use text::TextEmbedding;

use crate::domain::{ports::EmbeddingService, DomainError};
use crate::infrastructure::config::{EmbeddingConfig, EmbeddingProvider};

/// Builds the embedding provider selected by `config.provider`, with the
/// model and vector size resolved from the config.
pub async fn create_embedding_service(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingService>, DomainError> {
    let model = config.resolved_model();
    let dimension = config
        .resolved_dimension()
        .map_err(|e| DomainError::validation(e.to_string()))?;

    let service: Arc<dyn EmbeddingService> = match config.provider {
        EmbeddingProvider::Local => {
            Arc::new(LocalEmbedding::load(model, dimension, config.cache_dir.clone()).await?)
        }
        EmbeddingProvider::OpenAi => Arc::new(TextEmbedding::new(model, dimension)?),
    };

    tracing::info!(
        provider = ?config.provider,
        model = service.model_name(),
        dimension = service.dimension(),
        "embedding provider ready"
    );
    Ok(service)
}
