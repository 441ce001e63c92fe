use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use crate::application::SearchConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Effective process configuration. Built once at startup and passed into
/// constructors; nothing reads the environment after [`AppConfig::load`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub files: FilesConfig,
    pub vector_store: VectorStoreConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
    pub chunk_size: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            max_file_size: 10 * 1024 * 1024,
            chunk_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    /// In-process engine persisted as a JSON snapshot under `db_dir`.
    Local,
    Qdrant,
}

impl FromStr for VectorStoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorStoreBackend,
    pub db_dir: PathBuf,
    pub collection: String,
    pub qdrant_url: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorStoreBackend::Local,
            db_dir: PathBuf::from("./vector_db"),
            collection: "documents".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Sentence-transformer models run in process through fastembed.
    Local,
    #[serde(rename = "openai")]
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            other => Err(other.to_string()),
        }
    }
}

pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Lowercased model name without an organisation prefix such as
/// `sentence-transformers/` or `BAAI/`.
pub fn local_model_key(model: &str) -> String {
    let name = model.trim();
    name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase()
}

/// Output size of the models each provider is known to serve.
pub fn known_dimension(provider: EmbeddingProvider, model: &str) -> Option<usize> {
    match provider {
        EmbeddingProvider::Local => match local_model_key(model).as_str() {
            "all-minilm-l6-v2" | "all-minilm-l12-v2" | "bge-small-en-v1.5" => Some(384),
            "multilingual-e5-small" => Some(384),
            "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => Some(768),
            "multilingual-e5-base" => Some(768),
            "bge-large-en-v1.5" | "multilingual-e5-large" => Some(1024),
            _ => None,
        },
        EmbeddingProvider::OpenAi => match model.trim() {
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        },
    }
}

/// `model` and `dimension` fall back to what the provider implies; see
/// [`EmbeddingConfig::resolved_model`] and [`EmbeddingConfig::resolved_dimension`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
    pub dimension: Option<usize>,
    /// Where fastembed keeps downloaded model files.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: None,
            dimension: None,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn resolved_model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) if !model.trim().is_empty() => model.trim(),
            (_, EmbeddingProvider::Local) => DEFAULT_LOCAL_MODEL,
            (_, EmbeddingProvider::OpenAi) => DEFAULT_OPENAI_MODEL,
        }
    }

    /// Vector size the collection must be created with.
    ///
    /// An explicit `dimension` must agree with a known model; an unknown
    /// model needs an explicit one.
    pub fn resolved_dimension(&self) -> Result<usize, ConfigError> {
        let model = self.resolved_model();
        let known = known_dimension(self.provider, model);
        let invalid = |value: String| ConfigError::InvalidValue {
            key: "EMBEDDING_DIMENSION".to_string(),
            value,
        };

        match (self.dimension, known) {
            (Some(0), _) => Err(invalid("0".to_string())),
            (Some(explicit), Some(expected)) if explicit != expected => Err(invalid(format!(
                "{explicit} (model {model} produces {expected})"
            ))),
            (Some(explicit), _) => Ok(explicit),
            (None, Some(expected)) => Ok(expected),
            (None, None) => Err(invalid(format!("unset (unknown model {model})"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

fn parse<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}

impl AppConfig {
    /// Defaults, then the YAML file named by `CONFIG_PATH` if set, then
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.embedding.resolved_dimension()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overrides fields from variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = lookup("API_PORT") {
            self.api.port = parse("API_PORT", v)?;
        }
        if let Some(v) = lookup("UPLOAD_DIR") {
            self.files.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAX_FILE_SIZE") {
            self.files.max_file_size = parse("MAX_FILE_SIZE", v)?;
        }
        if let Some(v) = lookup("CHUNK_SIZE") {
            self.files.chunk_size = parse("CHUNK_SIZE", v)?;
        }
        if let Some(v) = lookup("VECTOR_STORE_BACKEND") {
            self.vector_store.backend = parse("VECTOR_STORE_BACKEND", v)?;
        }
        if let Some(v) = lookup("VECTOR_DB_DIR") {
            self.vector_store.db_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("COLLECTION_NAME") {
            self.vector_store.collection = v;
        }
        if let Some(v) = lookup("QDRANT_URL") {
            self.vector_store.qdrant_url = v;
        }
        if let Some(v) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = parse("EMBEDDING_PROVIDER", v)?;
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = Some(v);
        }
        if let Some(v) = lookup("EMBEDDING_DIMENSION") {
            self.embedding.dimension = Some(parse("EMBEDDING_DIMENSION", v)?);
        }
        if let Some(v) = lookup("EMBEDDING_CACHE_DIR") {
            self.embedding.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SEARCH_DEFAULT_LIMIT") {
            self.search.default_limit = parse("SEARCH_DEFAULT_LIMIT", v)?;
        }
        if let Some(v) = lookup("SEARCH_MAX_LIMIT") {
            self.search.max_limit = parse("SEARCH_MAX_LIMIT", v)?;
        }
        if let Some(v) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }
}
