use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::storage::{validate_image, StoredObject},
    AppState,
};

pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/:bucket", post(upload_images).delete(delete_object))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: Vec<StoredObject>,
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteObjectRequest {
    pub path: Option<String>,
    pub url: Option<String>,
}

async fn upload_images(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    // Rejects unknown buckets before reading any data.
    state.storage.object_path(&bucket, &user.id)?;

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();
    let mut seen = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let file_name = match field.file_name() {
            Some(name) => name.to_string(),
            None => {
                errors.push("File field missing filename".to_string());
                continue;
            }
        };

        seen += 1;
        if seen > state.config.max_images {
            errors.push(format!(
                "{file_name} skipped: you can only upload up to {} images",
                state.config.max_images
            ));
            continue;
        }

        let content_type = field.content_type().map(str::to_string);

        let data = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                errors.push(format!("Failed to read file {file_name}: {e}"));
                continue;
            }
        };

        if let Err(e) = validate_image(
            &file_name,
            content_type.as_deref(),
            data.len(),
            state.config.max_image_bytes,
        ) {
            errors.push(e.to_string());
            continue;
        }

        match state.storage.upload(&bucket, &user.id, &file_name, &data).await {
            Ok(object) => uploaded.push(object),
            Err(e) => {
                tracing::warn!(bucket = %bucket, file = %file_name, error = %e, "upload failed");
                errors.push(format!("Failed to store {file_name}"));
            }
        }
    }

    tracing::info!(
        bucket = %bucket,
        user_id = %user.id,
        uploaded = uploaded.len(),
        failed = errors.len(),
        "upload finished"
    );

    Ok(Json(UploadResponse { uploaded, errors }))
}

async fn delete_object(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bucket): Path<String>,
    Json(body): Json<DeleteObjectRequest>,
) -> Result<Json<()>> {
    let path = match (&body.path, &body.url) {
        (Some(path), _) => path.as_str(),
        (None, Some(url)) => state
            .storage
            .path_from_url(&bucket, url)
            .ok_or_else(|| AppError::BadRequest("URL does not belong to this bucket".to_string()))?,
        (None, None) => {
            return Err(AppError::Validation(
                "Either path or url is required".to_string(),
            ))
        }
    };

    // Uploads live under the uploader's id.
    if !path.starts_with(&format!("{}/", user.id)) {
        return Err(AppError::Forbidden(
            "You can only delete your own uploads".to_string(),
        ));
    }

    state.storage.remove(&bucket, path).await?;
    Ok(Json(()))
}
