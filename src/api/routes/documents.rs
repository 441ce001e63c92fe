use axum::{
    extract::{rejection::QueryRejection, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::routes::upload;
use crate::api::state::AppState;
use crate::domain::metadata::{FILENAME_KEY, FILE_TYPE_KEY};
use crate::domain::{
    DocumentChunk, DomainError, FileType, MetadataFilter, NewChunk, OperationResult,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreRequest {
    pub chunks: Vec<NewChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreDocumentResponse {
    #[serde(flatten)]
    pub result: OperationResult,
    /// Chunks processed; zero when the store failed.
    pub document_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: Option<i64>,
    pub filename: Option<String>,
    pub file_type: Option<String>,
}

impl SearchParams {
    fn limit(&self) -> Result<Option<usize>, DomainError> {
        self.limit
            .map(|l| {
                usize::try_from(l).map_err(|_| DomainError::validation("limit must be at least 1"))
            })
            .transpose()
    }

    fn filter(&self) -> Result<Option<MetadataFilter>, DomainError> {
        let mut filter = MetadataFilter::new();
        if let Some(filename) = &self.filename {
            filter.insert(FILENAME_KEY.to_string(), filename.as_str().into());
        }
        if let Some(file_type) = &self.file_type {
            let file_type: FileType = file_type.parse()?;
            filter.insert(FILE_TYPE_KEY.to_string(), file_type.as_str().into());
        }
        Ok((!filter.is_empty()).then_some(filter))
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Accepts either a JSON chunk list or a multipart file upload; both end up
/// as the same chunk list handed to the store. An uploaded file is kept in
/// the upload directory only when its chunks were stored.
pub async fn store_document(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<StoreDocumentResponse>, ApiError> {
    let (chunks, original) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|r| ApiError::from_rejection(r.status(), r.body_text()))?;
        let (chunks, original) = upload::read_upload(multipart, &state.config.files).await?;
        (chunks, Some(original))
    } else {
        let Json(body) = Json::<StoreRequest>::from_request(request, &state)
            .await
            .map_err(|r| ApiError::from_rejection(r.status(), r.body_text()))?;
        (body.chunks, None)
    };

    let count = chunks.len();
    let result = state.document_service.store(chunks).await;
    let document_count = if result.success { count } else { 0 };

    if let Some(original) = original.filter(|_| result.success) {
        original.save(&state.config.files.upload_dir).await?;
    }

    Ok(Json(StoreDocumentResponse {
        result,
        document_count,
    }))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentChunk>, ApiError> {
    state
        .document_service
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document with ID {id} not found")))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<OperationResult> {
    Json(state.document_service.delete(&id).await)
}

pub async fn search_documents(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<DocumentChunk>>, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::from_rejection(r.status(), r.body_text()))?;
    let limit = params.limit()?;
    let filter = params.filter()?;

    let results = state
        .document_service
        .search(&params.query, limit, filter.as_ref())
        .await?;

    Ok(Json(results))
}
