mod document;
mod embedding;
mod record;

pub use document::{
    chunk_content, DocumentChunk, DocumentMetadata, FileType, MetadataInput, NewChunk,
    OperationResult,
};
pub use embedding::Embedding;
pub use record::{
    matches_filter, FlatRecord, MetadataFilter, MetadataValue, ScoredRecord, VectorRecord,
};
