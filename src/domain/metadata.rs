//! Conversion between typed document metadata and the engine's flat records.
//!
//! Writes are strict: [`MetadataInput::validate`] rejects missing required
//! fields before anything reaches the engine. Reads are permissive:
//! [`unflatten`] never fails and substitutes defaults for anything missing
//! or malformed, so a record written by an older client is still readable.

use tracing::debug;

use crate::domain::{
    DocumentChunk, DocumentMetadata, DomainError, FileType, FlatRecord, MetadataInput,
    MetadataValue, VectorRecord,
};

pub const DOC_ID_KEY: &str = "doc_id";
pub const FILENAME_KEY: &str = "filename";
pub const FILE_TYPE_KEY: &str = "file_type";
pub const CONTENT_LENGTH_KEY: &str = "content_length";
pub const UPLOAD_TIMESTAMP_KEY: &str = "upload_timestamp";

/// Keys written for every record. Extra metadata may not overwrite them.
pub const CORE_KEYS: [&str; 5] = [
    DOC_ID_KEY,
    FILENAME_KEY,
    CONTENT_LENGTH_KEY,
    UPLOAD_TIMESTAMP_KEY,
    FILE_TYPE_KEY,
];

pub const DEFAULT_FILENAME: &str = "unknown.txt";

fn text_length(text: &str) -> u64 {
    text.chars().count() as u64
}

fn missing(field: &str) -> DomainError {
    DomainError::validation(format!("Required metadata field '{field}' is missing"))
}

impl MetadataInput {
    /// Checks required fields and fills `content_length` from `text` when absent.
    pub fn validate(self, text: &str) -> Result<DocumentMetadata, DomainError> {
        let filename = self
            .filename
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| missing(FILENAME_KEY))?;
        let file_type: FileType = self
            .file_type
            .ok_or_else(|| missing(FILE_TYPE_KEY))?
            .parse()?;
        let upload_timestamp = self
            .upload_timestamp
            .ok_or_else(|| missing(UPLOAD_TIMESTAMP_KEY))?;

        Ok(DocumentMetadata {
            filename,
            file_type,
            content_length: self.content_length.unwrap_or_else(|| text_length(text)),
            upload_timestamp,
            additional_metadata: self.additional_metadata,
        })
    }
}

/// Flattens validated metadata into the scalar-only record stored next to the text.
///
/// Non-scalar `additional_metadata` values (objects, arrays, null) are dropped,
/// as are extras named like one of [`CORE_KEYS`].
pub fn flatten(doc_id: &str, metadata: &DocumentMetadata) -> FlatRecord {
    let mut record = FlatRecord::new();
    record.insert(DOC_ID_KEY.into(), doc_id.into());
    record.insert(FILENAME_KEY.into(), metadata.filename.as_str().into());
    record.insert(
        CONTENT_LENGTH_KEY.into(),
        MetadataValue::Integer(i64::try_from(metadata.content_length).unwrap_or(i64::MAX)),
    );
    record.insert(
        UPLOAD_TIMESTAMP_KEY.into(),
        metadata.upload_timestamp.as_str().into(),
    );
    record.insert(FILE_TYPE_KEY.into(), metadata.file_type.as_str().into());

    if let Some(extra) = &metadata.additional_metadata {
        for (key, value) in extra {
            if CORE_KEYS.contains(&key.as_str()) {
                debug!(doc_id, key = %key, "dropping metadata entry that shadows a core key");
                continue;
            }
            match MetadataValue::from_json(value) {
                Some(scalar) => {
                    record.insert(key.clone(), scalar);
                }
                None => debug!(doc_id, key = %key, "dropping non-scalar metadata entry"),
            }
        }
    }

    record
}

/// Rebuilds typed metadata from a flat record, never failing.
///
/// The whole record is copied into `additional_metadata`, so scalar extras
/// survive a store/read cycle while nested values dropped by [`flatten`] do not.
pub fn unflatten(record: &FlatRecord, fallback_text: &str) -> DocumentMetadata {
    let string_field = |key: &str| record.get(key).and_then(MetadataValue::as_str);

    let file_type = string_field(FILE_TYPE_KEY)
        .and_then(|s| s.parse().ok())
        .unwrap_or(FileType::Txt);
    let content_length = record
        .get(CONTENT_LENGTH_KEY)
        .and_then(MetadataValue::as_integer)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_else(|| text_length(fallback_text));

    DocumentMetadata {
        filename: string_field(FILENAME_KEY)
            .unwrap_or(DEFAULT_FILENAME)
            .to_string(),
        file_type,
        content_length,
        upload_timestamp: string_field(UPLOAD_TIMESTAMP_KEY)
            .unwrap_or_default()
            .to_string(),
        additional_metadata: Some(
            record
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        ),
    }
}

/// Turns an engine record into the public chunk shape.
///
/// The chunk id comes from `doc_id` when present, else from the engine id.
pub fn reconstruct(record: VectorRecord, score: Option<f32>) -> DocumentChunk {
    let metadata = unflatten(&record.metadata, &record.text);
    let id = record
        .metadata
        .get(DOC_ID_KEY)
        .and_then(MetadataValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| record.id.clone());

    DocumentChunk {
        id,
        text: record.text,
        metadata,
        embedding_id: Some(record.id),
        score,
    }
}
