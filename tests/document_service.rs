//! Facade behaviour against the local engine and the hashing embedder.

mod common;

use std::sync::Arc;

use chunkvault::application::DocumentService;
use chunkvault::domain::ports::VectorStore;
use chunkvault::domain::{FileType, MetadataInput, NewChunk};
use chunkvault::application::SearchConfig;
use chunkvault::infrastructure::InMemoryVectorStore;
use common::HashingEmbedding;

fn service(store: Arc<dyn VectorStore>) -> DocumentService {
    DocumentService::new(
        Arc::new(HashingEmbedding::new(384)),
        store,
        SearchConfig::default(),
    )
}

fn txt_metadata(filename: &str) -> MetadataInput {
    MetadataInput::new(filename, FileType::Txt, "2024-05-01T12:00:00Z")
}

#[tokio::test]
async fn test_store_get_delete_round_trip() {
    let service = service(Arc::new(InMemoryVectorStore::new()));

    let stored = service
        .store(vec![NewChunk::new("d1", "hello world", txt_metadata("greeting.txt"))])
        .await;
    assert!(stored.success, "{stored:?}");
    assert_eq!(stored.document_ids, Some(vec!["d1".to_string()]));

    let chunk = service.get("d1").await.unwrap().expect("d1 should exist");
    assert_eq!(chunk.id, "d1");
    assert_eq!(chunk.text, "hello world");
    assert_eq!(chunk.metadata.file_type, FileType::Txt);
    assert_eq!(chunk.metadata.filename, "greeting.txt");
    assert_eq!(chunk.metadata.content_length, 11);

    let deleted = service.delete("d1").await;
    assert!(deleted.success);
    assert!(service.get("d1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_required_metadata_writes_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let service = service(store.clone());

    for field in ["filename", "file_type", "upload_timestamp"] {
        let mut metadata = txt_metadata("notes.txt");
        match field {
            "filename" => metadata.filename = None,
            "file_type" => metadata.file_type = None,
            _ => metadata.upload_timestamp = None,
        }

        let result = service
            .store(vec![NewChunk::new("x", "some text", metadata)])
            .await;

        assert!(!result.success, "missing {field} should fail");
        let error = result.error.expect("error should be set");
        assert!(error.contains(field), "{error}");
    }

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_ids() {
    let service = service(Arc::new(InMemoryVectorStore::new()));

    assert!(service.get("nope").await.unwrap().is_none());

    let result = service.delete("nope").await;
    assert!(result.success);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_empty_query_returns_everything_when_under_limit() {
    let service = service(Arc::new(InMemoryVectorStore::new()));
    let chunks = ["alpha", "beta", "gamma"]
        .iter()
        .map(|t| NewChunk::new(*t, format!("chunk about {t}"), txt_metadata("greek.txt")))
        .collect();
    assert!(service.store(chunks).await.success);

    let results = service.search("", Some(5), None).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|c| c.score.is_some()));
}

#[tokio::test]
async fn test_zero_limit_is_a_validation_error() {
    let service = service(Arc::new(InMemoryVectorStore::new()));

    let err = service.search("anything", Some(0), None).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_exact_text_ranks_first_among_near_duplicates() {
    let service = service(Arc::new(InMemoryVectorStore::new()));
    let dog = "the quick brown fox jumps over the lazy dog";
    let cat = "the quick brown fox jumps over the lazy cat";
    let result = service
        .store(vec![
            NewChunk::new("cat", cat, txt_metadata("animals.txt")),
            NewChunk::new("dog", dog, txt_metadata("animals.txt")),
        ])
        .await;
    assert!(result.success);

    let results = service.search(dog, Some(2), None).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "dog");
    assert!(results[0].score.unwrap() > results[1].score.unwrap());
}

#[tokio::test]
async fn test_additional_metadata_survives_storage() {
    let service = service(Arc::new(InMemoryVectorStore::new()));
    let metadata = txt_metadata("report.txt")
        .with_additional("author", "ada".into())
        .with_additional("pages", 12.into())
        .with_additional("tags", serde_json::json!(["a", "b"]));

    assert!(service
        .store(vec![NewChunk::new("r1", "quarterly report", metadata)])
        .await
        .success);

    let chunk = service.get("r1").await.unwrap().unwrap();
    let extra = chunk.metadata.additional_metadata.unwrap();
    assert_eq!(extra.get("author"), Some(&serde_json::json!("ada")));
    assert_eq!(extra.get("pages"), Some(&serde_json::json!(12)));
    assert!(!extra.contains_key("tags"));
}

#[tokio::test]
async fn test_documents_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = InMemoryVectorStore::open(dir.path(), "documents").await.unwrap();
        let service = service(Arc::new(store));
        assert!(service
            .store(vec![NewChunk::new("p1", "persisted text", txt_metadata("p.txt"))])
            .await
            .success);
    }

    let store = InMemoryVectorStore::open(dir.path(), "documents").await.unwrap();
    let service = service(Arc::new(store));
    let chunk = service.get("p1").await.unwrap().expect("p1 should be reloaded");
    assert_eq!(chunk.text, "persisted text");
}
