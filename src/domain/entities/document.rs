use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    /// Infers the type from a filename extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            other => Err(DomainError::validation(format!(
                "'{other}' is not a valid file_type (expected pdf, docx or txt)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub content_length: u64,
    pub upload_timestamp: String,
    pub additional_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub embedding_id: Option<String>,
    /// Relevance reported by the engine; only set on search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Metadata as received from callers, before validation.
///
/// Every field is optional so that a missing field is reported as a
/// failed store result rather than a request decoding error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataInput {
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub content_length: Option<u64>,
    pub upload_timestamp: Option<String>,
    pub additional_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MetadataInput {
    pub fn new(
        filename: impl Into<String>,
        file_type: FileType,
        upload_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            file_type: Some(file_type.as_str().to_string()),
            content_length: None,
            upload_timestamp: Some(upload_timestamp.into()),
            additional_metadata: None,
        }
    }

    pub fn with_additional(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// One chunk submitted for storage. A missing id is replaced with a fresh UUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: MetadataInput,
}

impl NewChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: MetadataInput) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            metadata,
        }
    }
}

/// Outcome of a write against the store. Failures are reported here rather
/// than returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    pub document_ids: Option<Vec<String>>,
    pub error: Option<String>,
}

impl OperationResult {
    pub fn succeeded(message: impl Into<String>, document_ids: Option<Vec<String>>) -> Self {
        Self {
            success: true,
            message: message.into(),
            document_ids,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            document_ids: None,
            error: Some(error.into()),
        }
    }
}

/// Splits content into chunks of at most `chunk_size` characters.
///
/// Paragraphs (separated by a blank line) are joined while they fit. A
/// paragraph longer than `chunk_size` is hard-split, preferring the last
/// newline, then the last space, inside the limit.
pub fn chunk_content(content: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let paragraphs = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut chunks = Vec::new();
    let mut current_chunk = String::new();
    let mut current_chars = 0;

    for paragraph in paragraphs {
        let chars = paragraph.chars().count();
        let would_exceed = !current_chunk.is_empty() && current_chars + 2 + chars > chunk_size;

        if would_exceed || (chars > chunk_size && !current_chunk.is_empty()) {
            chunks.push(std::mem::take(&mut current_chunk));
            current_chars = 0;
        }

        if chars > chunk_size {
            split_oversized(paragraph, chunk_size, &mut chunks);
            continue;
        }

        if !current_chunk.is_empty() {
            current_chunk.push_str("\n\n");
            current_chars += 2;
        }
        current_chunk.push_str(paragraph);
        current_chars += chars;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

fn split_oversized(paragraph: &str, chunk_size: usize, chunks: &mut Vec<String>) {
    let mut remaining = paragraph;
    while !remaining.is_empty() {
        // Byte offset just past `chunk_size` characters.
        let limit = remaining
            .char_indices()
            .nth(chunk_size)
            .map_or(remaining.len(), |(i, _)| i);

        let split_at = if limit < remaining.len() {
            let window = &remaining[..limit];
            window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .map_or(limit, |pos| pos + 1)
        } else {
            limit
        };

        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_content_single_chunk() {
        let content = "Hello world.\n\nThis is a test.";
        let chunks = chunk_content(content, 100);

        assert_eq!(chunks, vec!["Hello world.\n\nThis is a test."]);
    }

    #[test]
    fn test_chunk_content_multiple_chunks() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_content(content, 30);

        assert_eq!(
            chunks,
            vec!["First paragraph.", "Second paragraph.", "Third paragraph."]
        );
    }

    #[test]
    fn test_chunk_content_splits_long_single_newline_text() {
        let content = (0..500)
            .map(|i| format!("line number {i:04}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(content.chars().count() > 7000);

        let chunks = chunk_content(&content, 1000);

        assert!(chunks.len() >= 8, "got {} chunks", chunks.len());
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        assert_eq!(chunks.join("\n"), content);
    }

    #[test]
    fn test_chunk_content_counts_characters() {
        let content = "é".repeat(25);
        let chunks = chunk_content(&content, 10);

        let sizes: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_chunk_content_flushes_before_oversized_paragraph() {
        let content = "intro\n\naaaa bbbb cccc dddd";
        let chunks = chunk_content(content, 10);

        assert_eq!(chunks, vec!["intro", "aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_chunk_content_empty() {
        assert!(chunk_content("", 100).is_empty());
        assert!(chunk_content("\n\n  \n\n", 100).is_empty());
    }

    #[test]
    fn test_file_type_parse_is_case_insensitive() {
        assert_eq!("PDF".parse::<FileType>().unwrap(), FileType::Pdf);
        assert_eq!(" Docx ".parse::<FileType>().unwrap(), FileType::Docx);
        assert!("markdown".parse::<FileType>().unwrap_err().is_validation());
    }

    #[test]
    fn test_file_type_from_filename() {
        assert_eq!(FileType::from_filename("report.PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_filename("notes.txt"), Some(FileType::Txt));
        assert_eq!(FileType::from_filename("archive.tar.gz"), None);
        assert_eq!(FileType::from_filename("README"), None);
    }

    #[test]
    fn test_chunk_serializes_without_score_when_absent() {
        let chunk = DocumentChunk {
            id: "d1".into(),
            text: "hello".into(),
            metadata: DocumentMetadata {
                filename: "a.txt".into(),
                file_type: FileType::Txt,
                content_length: 5,
                upload_timestamp: String::new(),
                additional_metadata: None,
            },
            embedding_id: Some("d1".into()),
            score: None,
        };

        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("score").is_none());
        assert_eq!(json["metadata"]["file_type"], "txt");
    }
}
