use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::{BlobKey, Bucket};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::{post_attachment, post_image};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Images are shown inline, with the media type recorded at upload.
#[instrument(skip(state), fields(filename))]
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let key = BlobKey::new(Bucket::Images, filename.clone())?;
    let image = post_image::Entity::find()
        .filter(post_image::Column::Filename.eq(&filename))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

    stream_blob(
        &state,
        &key,
        &image.content_type,
        content_disposition_value("inline", &filename),
    )
    .await
}

/// Attachments download under the name they were uploaded with.
#[instrument(skip(state), fields(filename))]
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let key = BlobKey::new(Bucket::Files, filename.clone())?;
    let attachment = post_attachment::Entity::find()
        .filter(post_attachment::Column::Filename.eq(&filename))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    let content_type = attachment
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    stream_blob(
        &state,
        &key,
        content_type,
        content_disposition_value("attachment", &attachment.original_filename),
    )
    .await
}

async fn stream_blob(
    state: &AppState,
    key: &BlobKey,
    content_type: &str,
    disposition: String,
) -> Result<Response, AppError> {
    let size = state.blob_store.size(key).await?;
    let reader = state.blob_store.get_stream(key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Content-Type-Options", "nosniff")
        .header(header::CONTENT_SECURITY_POLICY, "sandbox")
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
