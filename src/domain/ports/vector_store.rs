use crate::domain::{errors::DomainError, Embedding, MetadataFilter, ScoredRecord, VectorRecord};
use async_trait::async_trait;

/// A persistent collection of `(id, text, vector, flat metadata)` tuples.
///
/// Implementations must offer native point lookup through
/// [`get_by_ids`](VectorStore::get_by_ids); retrieval by id never goes
/// through a bounded similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Adds records with their vectors. An existing id is replaced.
    async fn add(&self, records: &[VectorRecord], embeddings: &[Embedding])
        -> Result<(), DomainError>;

    /// Returns the records stored under `ids`, skipping unknown ids.
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<VectorRecord>, DomainError>;

    /// Best match first, at most `top_k` results, restricted to `filter` when given.
    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>, DomainError>;

    /// Removes the given ids. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<(), DomainError>;

    fn collection(&self) -> &str;
}
