use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::domain::metadata::UPLOAD_TIMESTAMP_KEY;
use crate::domain::{chunk_content, FileType, MetadataInput, NewChunk};
use crate::infrastructure::config::FilesConfig;
use crate::infrastructure::extract_text;

const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::from_rejection(err.status(), err.body_text())
}

/// Keeps only the final path component of a client-supplied filename.
fn sanitize_filename(raw: &str) -> Option<String> {
    Path::new(raw.rsplit(['/', '\\']).next().unwrap_or(raw))
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// The uploaded file as received, kept once its chunks are stored.
pub struct OriginalFile {
    filename: String,
    bytes: Bytes,
}

impl OriginalFile {
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, ApiError> {
        let io_error = |e: std::io::Error| ApiError::Internal(format!("cannot store upload: {e}"));

        tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        let path = dir.join(format!("{}-{}", Uuid::new_v4(), self.filename));
        tokio::fs::write(&path, &self.bytes).await.map_err(io_error)?;

        info!(path = %path.display(), bytes = self.bytes.len(), "upload saved");
        Ok(path)
    }
}

/// Turns a multipart upload into chunks sharing one set of metadata.
///
/// Fields: `file` (required), `upload_timestamp` (optional, defaults to now),
/// any other text field becomes an extra metadata string. Nothing is written
/// to disk here.
pub async fn read_upload(
    mut multipart: Multipart,
    files: &FilesConfig,
) -> Result<(Vec<NewChunk>, OriginalFile), ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut upload_timestamp: Option<String> = None;
    let mut extra = serde_json::Map::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let filename = field
                .file_name()
                .and_then(sanitize_filename)
                .ok_or_else(|| ApiError::BadRequest("file field must carry a filename".into()))?;
            let bytes = field.bytes().await.map_err(multipart_error)?;
            file = Some((filename, bytes));
        } else if !name.is_empty() {
            let value = field.text().await.map_err(multipart_error)?;
            if name == UPLOAD_TIMESTAMP_KEY {
                upload_timestamp = Some(value);
            } else {
                extra.insert(name, value.into());
            }
        }
    }

    let (filename, bytes) = file.ok_or_else(|| {
        ApiError::BadRequest(format!("multipart body must contain a '{FILE_FIELD}' field"))
    })?;
    if bytes.len() > files.max_file_size {
        return Err(ApiError::PayloadTooLarge(format!(
            "'{filename}' is {} bytes, the limit is {}",
            bytes.len(),
            files.max_file_size
        )));
    }
    let file_type = FileType::from_filename(&filename).ok_or_else(|| {
        ApiError::Unprocessable(format!(
            "Unsupported file type for '{filename}' (expected .pdf, .docx or .txt)"
        ))
    })?;

    let raw = bytes.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&raw, file_type))
        .await
        .map_err(|e| ApiError::Internal(format!("extraction task failed: {e}")))??;

    let pieces = chunk_content(&text, files.chunk_size);
    if pieces.is_empty() {
        return Err(ApiError::Unprocessable(format!(
            "No text could be extracted from '{filename}'"
        )));
    }

    let timestamp = upload_timestamp.unwrap_or_else(|| Utc::now().to_rfc3339());
    info!(filename = %filename, %file_type, chunks = pieces.len(), "upload extracted");

    let chunks = pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let mut metadata = MetadataInput::new(&filename, file_type, &timestamp);
            metadata.additional_metadata = Some(extra.clone());
            NewChunk {
                id: None,
                text,
                metadata: metadata.with_additional("chunk_index", index.into()),
            }
        })
        .collect();

    Ok((chunks, OriginalFile { filename, bytes }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(
            sanitize_filename("../../etc/passwd.txt").as_deref(),
            Some("passwd.txt")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("dir/"), None);
    }
}
