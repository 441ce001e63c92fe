use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, PointsIdsList, Range, SearchPointsBuilder, Struct,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, FlatRecord, MetadataFilter, MetadataValue,
    ScoredRecord, VectorRecord,
};

// Top-level payload layout. The flat metadata lives in its own object, so
// any metadata key name is allowed.
const TEXT_KEY: &str = "page_content";
const RECORD_ID_KEY: &str = "record_id";
const METADATA_KEY: &str = "metadata";

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::engine(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| DomainError::engine(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::engine(e.to_string()))?;
            tracing::info!(collection = %self.collection, dimension = self.dimension, "created qdrant collection");
        }

        Ok(())
    }

    /// Qdrant only accepts UUIDs or integers as point ids, so arbitrary
    /// record ids are mapped onto a name-based UUID.
    fn point_id(id: &str) -> PointId {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())
            .to_string()
            .into()
    }

    fn to_payload(record: &VectorRecord) -> Result<Payload, DomainError> {
        let metadata: serde_json::Map<String, serde_json::Value> = record
            .metadata
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();

        let mut object = serde_json::Map::new();
        object.insert(TEXT_KEY.to_string(), record.text.clone().into());
        object.insert(RECORD_ID_KEY.to_string(), record.id.clone().into());
        object.insert(METADATA_KEY.to_string(), metadata.into());

        Payload::try_from(serde_json::Value::Object(object))
            .map_err(|e| DomainError::internal(format!("Failed to create payload: {e}")))
    }

    fn scalar(value: &Value) -> Option<MetadataValue> {
        match value.kind.as_ref()? {
            Kind::StringValue(s) => Some(MetadataValue::String(s.clone())),
            Kind::IntegerValue(i) => Some(MetadataValue::Integer(*i)),
            Kind::DoubleValue(f) => Some(MetadataValue::Float(*f)),
            Kind::BoolValue(b) => Some(MetadataValue::Bool(*b)),
            _ => None,
        }
    }

    fn from_payload(mut payload: HashMap<String, Value>) -> Option<VectorRecord> {
        let text = match Self::scalar(&payload.remove(TEXT_KEY)?)? {
            MetadataValue::String(s) => s,
            _ => return None,
        };
        let id = match Self::scalar(&payload.remove(RECORD_ID_KEY)?)? {
            MetadataValue::String(s) => s,
            _ => return None,
        };
        let metadata: FlatRecord = match payload.remove(METADATA_KEY).and_then(|v| v.kind) {
            Some(Kind::StructValue(Struct { fields })) => fields
                .iter()
                .filter_map(|(k, v)| Self::scalar(v).map(|s| (k.clone(), s)))
                .collect(),
            _ => FlatRecord::new(),
        };

        Some(VectorRecord { id, text, metadata })
    }

    fn filter_key(key: &str) -> String {
        format!("{METADATA_KEY}.{key}")
    }

    fn to_filter(filter: &MetadataFilter) -> Filter {
        Filter::must(filter.iter().map(|(key, value)| match value {
            MetadataValue::String(s) => Condition::matches(Self::filter_key(key), s.clone()),
            MetadataValue::Integer(i) => Condition::matches(Self::filter_key(key), *i),
            MetadataValue::Bool(b) => Condition::matches(Self::filter_key(key), *b),
            MetadataValue::Float(f) => Condition::range(
                Self::filter_key(key),
                Range {
                    gte: Some(*f),
                    lte: Some(*f),
                    ..Default::default()
                },
            ),
        }))
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
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

        let points = records
            .iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                Ok(PointStruct::new(
                    Self::point_id(&record.id),
                    embedding.as_slice().to_vec(),
                    Self::to_payload(record)?,
                ))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::engine(e.to_string()))?;

        Ok(())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<VectorRecord>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| Self::point_id(id)).collect();
        let response = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection, point_ids).with_payload(true))
            .await
            .map_err(|e| DomainError::engine(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| Self::from_payload(point.payload))
            .collect())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>, DomainError> {
        let mut request =
            SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                .with_payload(true);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            request = request.filter(Self::to_filter(filter));
        }

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| DomainError::engine(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let score = point.score;
                Self::from_payload(point.payload).map(|record| ScoredRecord { record, score })
            })
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }

        let points = PointsIdsList {
            ids: ids.iter().map(|id| Self::point_id(id)).collect(),
        };

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(points)
                    .wait(true),
            )
            .await
            .map_err(|e| DomainError::engine(e.to_string()))?;

        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
