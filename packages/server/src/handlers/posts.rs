use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use sea_orm::TransactionTrait;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::services::content::{ContentService, NewUpload, discard_blobs, validate_new_post};
use crate::state::AppState;
use crate::utils::notice;

/// Room for several files of the configured per-file size plus form fields.
pub fn create_post_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    let per_file = usize::try_from(max_upload_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(per_file.saturating_mul(4).saturating_add(FORM_FIELDS_ALLOWANCE))
}

/// Body budget for the text fields of a post.
const FORM_FIELDS_ALLOWANCE: usize = 64 * 1024;

/// Fields of the new-post form.
#[derive(Default)]
struct NewPostForm {
    title: String,
    content: String,
    uploads: Vec<NewUpload>,
}

/// Why the form could not be read.
enum FormError {
    /// A file, or the request as a whole, was over the size limit.
    TooLarge,
    Malformed(MultipartError),
}

impl From<MultipartError> for FormError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FormError::TooLarge
        } else {
            FormError::Malformed(err)
        }
    }
}

#[instrument(skip(state, auth_user, jar, multipart), fields(user_id = auth_user.id()))]
pub async fn create_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let max_size = state.config.posting.max_upload_size;
    let form = match read_form(multipart, max_size).await {
        Ok(form) => form,
        Err(FormError::TooLarge) => {
            return Ok(notice::redirect(
                jar,
                &format!("Each file must be at most {max_size} bytes."),
                "/",
            ));
        }
        Err(FormError::Malformed(e)) => {
            return Err(AppError::Validation(format!("Multipart error: {e}")));
        }
    };

    if let Err(rejection) = validate_new_post(
        auth_user.can_post(),
        &form.title,
        &form.content,
        form.uploads.len(),
    ) {
        return Ok(notice::redirect(jar, rejection.message(), "/"));
    }

    let txn = state.db.begin().await?;
    let created = ContentService::new(&txn)
        .create_post(
            &*state.blob_store,
            auth_user.id(),
            &form.title,
            &form.content,
            form.uploads,
        )
        .await?;
    if let Err(e) = txn.commit().await {
        discard_blobs(&*state.blob_store, &created.blobs).await;
        return Err(e.into());
    }

    Ok(notice::redirect(jar, "Post created.", "/"))
}

async fn read_form(mut multipart: Multipart, max_size: u64) -> Result<NewPostForm, FormError> {
    let mut form = NewPostForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        match field.name() {
            Some("title") => form.title = field.text().await?,
            Some("content") => form.content = field.text().await?,
            Some("attachment") => {
                let original_filename = field.file_name().unwrap_or_default().trim().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = read_limited(&mut field, max_size).await?;
                // Browsers send an empty, unnamed part when no file was picked.
                if original_filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.uploads.push(NewUpload {
                    original_filename: if original_filename.is_empty() {
                        "upload".into()
                    } else {
                        original_filename
                    },
                    content_type,
                    bytes,
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }
    Ok(form)
}

/// Read a file part into memory, refusing anything over `max_size`.
async fn read_limited(field: &mut Field<'_>, max_size: u64) -> Result<Vec<u8>, FormError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if (bytes.len() + chunk.len()) as u64 > max_size {
            return Err(FormError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
