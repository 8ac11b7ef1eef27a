use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::HeaderMap,
};

use crate::error::GatewayError;
use crate::files::ContextUpload;
use crate::web::server::GatewayState;
use crate::web::types::FileListResponse;
use crate::web::{ApiError, session_from_headers};

pub async fn list_files_handler(
    State(state): State<Arc<GatewayState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FileListResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let files = state.gateway.list_files(&slug, &session).await?;
    Ok(Json(FileListResponse { files }))
}

/// Multipart upload. The `file` field carries the markdown document.
pub async fn upload_file_handler(
    State(state): State<Arc<GatewayState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FileListResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let mut multipart =
        multipart.map_err(|rejection| GatewayError::InvalidRequest(rejection.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        // Reject by name before reading the body.
        if !filename.is_empty() && !crate::files::is_markdown_filename(&filename) {
            return Err(GatewayError::InvalidFileType(filename).into());
        }
        let content = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(format!("failed to read upload: {e}")))?;
        upload = Some(ContextUpload::new(&filename, content)?);
        break;
    }
    let upload = upload.ok_or_else(|| {
        GatewayError::InvalidRequest("multipart field 'file' is required".to_string())
    })?;

    let files = state.gateway.upload_file(&slug, &session, &upload).await?;
    Ok(Json(FileListResponse { files }))
}

pub async fn delete_file_handler(
    State(state): State<Arc<GatewayState>>,
    Path((slug, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<FileListResponse>, ApiError> {
    let session = session_from_headers(&headers)?;
    let files = state.gateway.delete_file(&slug, &session, &filename).await?;
    Ok(Json(FileListResponse { files }))
}
