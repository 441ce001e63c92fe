use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::metadata::{flatten, reconstruct, DOC_ID_KEY};
use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DocumentChunk, DomainError, MetadataFilter, MetadataValue, NewChunk, OperationResult,
    VectorRecord,
};

pub const STORE_FAILED_MESSAGE: &str = "Failed to add document to vector store";

/// Result-count bounds for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 100,
        }
    }
}

/// Store, get, delete and search over one vector store collection.
///
/// Built once at startup and shared between requests. Writes report
/// failures through [`OperationResult`] instead of returning errors.
pub struct DocumentService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    search: SearchConfig,
}

impl DocumentService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        search: SearchConfig,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            search,
        }
    }

    pub fn collection(&self) -> &str {
        self.vector_store.collection()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding.model_name()
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding.dimension()
    }

    /// Stores pre-chunked text, each chunk carrying its own metadata.
    ///
    /// Every chunk is validated before anything is embedded or written, so
    /// one bad chunk fails the whole batch without touching the engine.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn store(&self, chunks: Vec<NewChunk>) -> OperationResult {
        match self.try_store(chunks).await {
            Ok(ids) => {
                info!(stored = ids.len(), "document chunks stored");
                let message = if ids.len() == 1 {
                    "Document added successfully".to_string()
                } else {
                    format!("{} document chunks added successfully", ids.len())
                };
                OperationResult::succeeded(message, Some(ids))
            }
            Err(e) => {
                warn!(error = %e, "failed to store document chunks");
                OperationResult::failed(STORE_FAILED_MESSAGE, e.to_string())
            }
        }
    }

    async fn try_store(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>, DomainError> {
        if chunks.is_empty() {
            return Err(DomainError::validation("At least one chunk is required"));
        }

        let records = chunks
            .into_iter()
            .map(|chunk| {
                let id = chunk
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let metadata = chunk.metadata.validate(&chunk.text)?;
                Ok(VectorRecord {
                    metadata: flatten(&id, &metadata),
                    id,
                    text: chunk.text,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(DomainError::engine(format!(
                "expected {} embeddings, got {}",
                records.len(),
                embeddings.len()
            )));
        }

        self.vector_store.add(&records, &embeddings).await?;

        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Point lookup by chunk id. `Ok(None)` when nothing is stored under `id`.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<DocumentChunk>, DomainError> {
        let records = self.vector_store.get_by_ids(&[id.to_string()]).await?;

        Ok(records
            .into_iter()
            .find(|r| r.metadata.get(DOC_ID_KEY).and_then(MetadataValue::as_str) == Some(id))
            .map(|r| reconstruct(r, None)))
    }

    /// Deleting an id that was never stored still reports success.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> OperationResult {
        match self.vector_store.delete(&[id.to_string()]).await {
            Ok(()) => {
                info!(id, "document deleted");
                OperationResult::succeeded(format!("Document {id} deleted successfully"), None)
            }
            Err(e) => {
                warn!(id, error = %e, "failed to delete document");
                OperationResult::failed(format!("Failed to delete document {id}"), e.to_string())
            }
        }
    }

    /// Similarity search, best match first.
    ///
    /// `limit` defaults to the configured default; zero is rejected and
    /// values above the configured maximum are clamped.
    #[instrument(skip(self, filter), fields(top_k))]
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<DocumentChunk>, DomainError> {
        let requested = limit.unwrap_or(self.search.default_limit);
        if requested == 0 {
            return Err(DomainError::validation("limit must be at least 1"));
        }
        let top_k = requested.min(self.search.max_limit.max(1));
        tracing::Span::current().record("top_k", top_k);

        let embedding = self.embedding.embed(query).await?;
        let results = self.vector_store.search(&embedding, top_k, filter).await?;

        Ok(results
            .into_iter()
            .map(|r| reconstruct(r.record, Some(r.score)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Embedding, FileType, MetadataInput, ScoredRecord};
    use crate::infrastructure::InMemoryVectorStore;
    use async_trait::async_trait;

    /// Two-dimensional vectors from text length and vowel count.
    struct ShapeEmbedding;

    #[async_trait]
    impl EmbeddingService for ShapeEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(Embedding::new(vec![text.len() as f32 + 1.0, vowels as f32]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "shape"
        }
    }

    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn add(&self, _: &[VectorRecord], _: &[Embedding]) -> Result<(), DomainError> {
            Err(DomainError::engine("disk full"))
        }

        async fn get_by_ids(&self, _: &[String]) -> Result<Vec<VectorRecord>, DomainError> {
            Err(DomainError::engine("unreachable"))
        }

        async fn search(
            &self,
            _: &Embedding,
            _: usize,
            _: Option<&MetadataFilter>,
        ) -> Result<Vec<ScoredRecord>, DomainError> {
            Err(DomainError::engine("unreachable"))
        }

        async fn delete(&self, _: &[String]) -> Result<(), DomainError> {
            Err(DomainError::engine("read-only collection"))
        }

        fn collection(&self) -> &str {
            "failing"
        }
    }

    fn service_with(store: Arc<dyn VectorStore>) -> DocumentService {
        DocumentService::new(
            Arc::new(ShapeEmbedding),
            store,
            SearchConfig {
                default_limit: 5,
                max_limit: 3,
            },
        )
    }

    fn chunk(id: &str, text: &str) -> NewChunk {
        NewChunk::new(
            id,
            text,
            MetadataInput::new("a.txt", FileType::Txt, "2024-01-01T00:00:00Z"),
        )
    }

    #[tokio::test]
    async fn test_store_generates_missing_ids() {
        let store = Arc::new(InMemoryVectorStore::new());
        let service = service_with(store.clone());

        let mut anonymous = chunk("", "no id here");
        anonymous.id = None;
        let result = service.store(vec![anonymous, chunk("  ", "blank id")]).await;

        assert!(result.success);
        let ids = result.document_ids.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_store_rejects_empty_batch() {
        let service = service_with(Arc::new(InMemoryVectorStore::new()));
        let result = service.store(Vec::new()).await;

        assert!(!result.success);
        assert_eq!(result.message, STORE_FAILED_MESSAGE);
        assert!(result.error.unwrap().contains("At least one chunk"));
    }

    #[tokio::test]
    async fn test_one_invalid_chunk_fails_whole_batch() {
        let store = Arc::new(InMemoryVectorStore::new());
        let service = service_with(store.clone());

        let mut bad = chunk("d2", "bad");
        bad.metadata.upload_timestamp = None;
        let result = service.store(vec![chunk("d1", "good"), bad]).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("upload_timestamp"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_engine_failures_become_results() {
        let service = service_with(Arc::new(FailingStore));

        let stored = service.store(vec![chunk("d1", "hello")]).await;
        assert!(!stored.success);
        assert_eq!(stored.error.as_deref(), Some("Engine error: disk full"));

        let deleted = service.delete("d1").await;
        assert!(!deleted.success);
        assert_eq!(deleted.message, "Failed to delete document d1");
        assert!(deleted.error.unwrap().contains("read-only collection"));

        assert!(matches!(service.get("d1").await, Err(DomainError::Engine(_))));
    }

    #[tokio::test]
    async fn test_search_limit_bounds() {
        let service = service_with(Arc::new(InMemoryVectorStore::new()));
        let batch = (0..6)
            .map(|i| chunk(&format!("d{i}"), &format!("chunk number {i}")))
            .collect();
        assert!(service.store(batch).await.success);

        let err = service.search("chunk", Some(0), None).await.unwrap_err();
        assert!(err.is_validation());

        let clamped = service.search("chunk", Some(50), None).await.unwrap();
        assert_eq!(clamped.len(), 3);

        let defaulted = service.search("chunk", None, None).await.unwrap();
        assert_eq!(defaulted.len(), 3);
    }
}
