use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};

const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// OpenAI embeddings through `rig`.
pub struct TextEmbedding {
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    /// Fails when `OPENAI_API_KEY` is not set, since `rig` would panic later.
    pub fn new(model: &str, dimension: usize) -> Result<Self, DomainError> {
        if std::env::var(API_KEY_VAR).map_or(true, |k| k.trim().is_empty()) {
            return Err(DomainError::internal(format!(
                "{API_KEY_VAR} must be set to use the openai embedding provider"
            )));
        }
        Ok(Self {
            model: model.to_string(),
            dimension,
        })
    }
}

/// The API rejects empty input, so blank texts map to the zero vector.
fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn to_embedding(emb: rig::embeddings::Embedding) -> Embedding {
    Embedding::new(emb.vec.into_iter().map(|x| x as f32).collect())
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::engine("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let pending: Vec<&str> = texts.iter().copied().filter(|t| !is_blank(t)).collect();

        let mut computed = if pending.is_empty() {
            Vec::new()
        } else {
            let client = openai::Client::from_env();
            let model = client.embedding_model(&self.model);

            let mut builder = EmbeddingsBuilder::new(model);
            for text in &pending {
                builder = builder
                    .document(*text)
                    .map_err(|e| DomainError::engine(e.to_string()))?;
            }

            builder
                .build()
                .await
                .map_err(|e| DomainError::engine(e.to_string()))?
                .into_iter()
                .map(|(_doc, emb)| to_embedding(emb.first()))
                .collect::<Vec<_>>()
        }
        .into_iter();

        if computed.len() != pending.len() {
            return Err(DomainError::engine(format!(
                "Expected {} embeddings, provider returned {}",
                pending.len(),
                computed.len()
            )));
        }

        texts
            .iter()
            .map(|text| {
                if is_blank(text) {
                    Ok(Embedding::zeros(self.dimension))
                } else {
                    computed
                        .next()
                        .ok_or_else(|| DomainError::engine("No embedding returned"))
                }
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
