use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::local_model_key;

/// Sentence-transformer embeddings computed in process by fastembed.
///
/// The ONNX model is fetched from Hugging Face on first start and cached;
/// after that no network access is needed. Inference runs on the blocking
/// pool since it is CPU bound.
pub struct LocalEmbedding {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

fn fastembed_model(name: &str) -> Result<EmbeddingModel, DomainError> {
    match local_model_key(name).as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        other => Err(DomainError::validation(format!(
            "Unknown local embedding model '{other}'. Supported: all-MiniLM-L6-v2, \
             all-MiniLM-L12-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, multilingual-e5-small, \
             multilingual-e5-base, multilingual-e5-large"
        ))),
    }
}

impl LocalEmbedding {
    /// Loads (and on first use downloads) `model_name`.
    pub async fn load(
        model_name: &str,
        dimension: usize,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, DomainError> {
        let model = fastembed_model(model_name)?;

        let engine = tokio::task::spawn_blocking(move || {
            let mut options = InitOptions::new(model).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| DomainError::internal(format!("embedding model loader failed: {e}")))?
        .map_err(|e| {
            DomainError::engine(format!("Failed to initialize local embedding model: {e}"))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(engine)),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::engine("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut engine = model
                .lock()
                .map_err(|_| DomainError::internal("embedding model lock poisoned"))?;
            engine
                .embed(owned, None)
                .map_err(|e| DomainError::engine(format!("Local embedding failed: {e}")))
        })
        .await
        .map_err(|e| DomainError::internal(format!("embedding task failed: {e}")))??;

        vectors
            .into_iter()
            .map(|v| {
                if v.len() == self.dimension {
                    Ok(Embedding::new(v))
                } else {
                    Err(DomainError::engine(format!(
                        "model {} returned {} dimensions, expected {}",
                        self.model_name,
                        v.len(),
                        self.dimension
                    )))
                }
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
