use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{
    matches_filter, ports::VectorStore, DomainError, Embedding, MetadataFilter, ScoredRecord,
    VectorRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    record: VectorRecord,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    collection: String,
    points: Vec<StoredPoint>,
}

/// Brute-force cosine search over points held in memory.
///
/// When opened with [`InMemoryVectorStore::open`] every mutation rewrites
/// `<dir>/<collection>.json` before returning, so the collection survives
/// restarts. Points keep insertion order, which breaks score ties.
pub struct InMemoryVectorStore {
    collection: String,
    points: RwLock<Vec<StoredPoint>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::with_collection("documents")
    }

    pub fn with_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            points: RwLock::new(Vec::new()),
            snapshot_path: None,
        }
    }

    /// Opens (or creates) a collection persisted under `dir`.
    pub async fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::engine(format!("cannot create {}: {e}", dir.display())))?;

        let path = dir.join(format!("{collection}.json"));
        let points = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    DomainError::engine(format!("corrupt snapshot {}: {e}", path.display()))
                })?;
                snapshot.points
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(DomainError::engine(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        info!(collection, path = %path.display(), points = points.len(), "opened local collection");

        Ok(Self {
            collection: collection.to_string(),
            points: RwLock::new(points),
            snapshot_path: Some(path),
        })
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    /// Writes the snapshot through a temporary file so a crash never leaves
    /// a truncated collection behind. Callers hold the write lock.
    async fn persist(&self, points: &[StoredPoint]) -> Result<(), DomainError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = Snapshot {
            collection: self.collection.clone(),
            points: points.to_vec(),
        };
        let bytes =
            serde_json::to_vec(&snapshot).map_err(|e| DomainError::internal(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| DomainError::engine(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| DomainError::engine(format!("cannot replace {}: {e}", path.display())))?;

        debug!(collection = %self.collection, points = points.len(), "snapshot written");
        Ok(())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(
        &self,
        records: &[VectorRecord],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        if records.len() != embeddings.len() {
            return Err(DomainError::internal(format!(
                "{} records but {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }

        let mut store = self.points.write().await;

        if let Some(expected) = store.first().map(|p| p.vector.len()) {
            if let Some(bad) = embeddings.iter().find(|e| e.dimension() != expected) {
                return Err(DomainError::engine(format!(
                    "embedding dimension {} does not match collection dimension {expected}",
                    bad.dimension()
                )));
            }
        }

        let mut next = store.clone();
        for (record, embedding) in records.iter().zip(embeddings) {
            next.retain(|p| p.record.id != record.id);
            next.push(StoredPoint {
                record: record.clone(),
                vector: embedding.as_slice().to_vec(),
            });
        }

        self.persist(&next).await?;
        *store = next;
        Ok(())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<VectorRecord>, DomainError> {
        let store = self.points.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| store.iter().find(|p| &p.record.id == id))
            .map(|p| p.record.clone())
            .collect())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>, DomainError> {
        let store = self.points.read().await;

        let mut results: Vec<ScoredRecord> = store
            .iter()
            .filter(|p| filter.map_or(true, |f| matches_filter(&p.record.metadata, f)))
            .map(|p| ScoredRecord {
                record: p.record.clone(),
                score: query.cosine_similarity(&p.vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), DomainError> {
        let mut store = self.points.write().await;

        let mut next = store.clone();
        next.retain(|p| !ids.contains(&p.record.id));
        if next.len() == store.len() {
            return Ok(());
        }

        self.persist(&next).await?;
        *store = next;
        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
