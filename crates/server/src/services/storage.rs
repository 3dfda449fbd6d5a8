// Object storage: public buckets on the local filesystem

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const MARKETPLACE_BUCKET: &str = "marketplace-images";
pub const AVATAR_BUCKET: &str = "avatars";
pub const BUCKETS: [&str; 2] = [MARKETPLACE_BUCKET, AVATAR_BUCKET];

#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StorageService {
    base_path: PathBuf,
    public_base_url: String,
}

impl StorageService {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn init(&self) -> Result<()> {
        for bucket in BUCKETS {
            fs::create_dir_all(self.base_path.join(bucket))
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create bucket {bucket}: {e}")))?;
        }
        Ok(())
    }

    pub fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        if !BUCKETS.contains(&bucket) {
            return Err(AppError::NotFound(format!("Unknown bucket '{bucket}'")));
        }

        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(AppError::BadRequest(format!("Invalid object path '{path}'")));
        }

        Ok(self.base_path.join(bucket).join(relative))
    }

    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/{bucket}/{path}", self.public_base_url)
    }

    // Inverse of `public_url`.
    pub fn path_from_url<'a>(&self, bucket: &str, url: &'a str) -> Option<&'a str> {
        let prefix = format!("{}/storage/{bucket}/", self.public_base_url);
        url.strip_prefix(prefix.as_str())
    }

    pub async fn upload(
        &self,
        bucket: &str,
        prefix: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<StoredObject> {
        let path = object_name(prefix, file_name);
        let full_path = self.object_path(bucket, &path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directories: {e}")))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write object: {e}")))?;

        tracing::debug!(bucket, path = %path, bytes = data.len(), "object stored");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            url: self.public_url(bucket, &path),
            path,
        })
    }

    // A missing object is not an error.
    pub async fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        let full_path = self.object_path(bucket, path)?;

        if full_path.exists() {
            fs::remove_file(&full_path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete object: {e}")))?;
        }

        Ok(())
    }
}

pub fn validate_image(
    file_name: &str,
    content_type: Option<&str>,
    size: usize,
    max_bytes: usize,
) -> Result<()> {
    if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return Err(AppError::Validation(format!(
            "{file_name} is not an image file"
        )));
    }
    if size == 0 {
        return Err(AppError::Validation(format!("{file_name} is empty")));
    }
    if size > max_bytes {
        return Err(AppError::Validation(format!(
            "{file_name} is larger than {}MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

// <prefix>/<millis>-<random>-<sanitized name>
fn object_name(prefix: &str, file_name: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}/{}-{}-{}",
        Utc::now().timestamp_millis(),
        &random[..8],
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("my photo.png"), "my_photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn object_paths_stay_inside_bucket() {
        let storage = StorageService::new("/tmp/storage", "http://localhost:3000/");
        assert!(storage.object_path(MARKETPLACE_BUCKET, "u1/a.png").is_ok());
        assert!(storage.object_path(MARKETPLACE_BUCKET, "../a.png").is_err());
        assert!(storage.object_path(MARKETPLACE_BUCKET, "/etc/passwd").is_err());
        assert!(storage.object_path("secrets", "a.png").is_err());
    }

    #[test]
    fn urls_round_trip_to_paths() {
        let storage = StorageService::new("/tmp/storage", "http://localhost:3000/");
        let url = storage.public_url(AVATAR_BUCKET, "u1/1-abc-me.png");
        assert_eq!(url, "http://localhost:3000/storage/avatars/u1/1-abc-me.png");
        assert_eq!(
            storage.path_from_url(AVATAR_BUCKET, &url),
            Some("u1/1-abc-me.png")
        );
        assert_eq!(storage.path_from_url(MARKETPLACE_BUCKET, &url), None);
    }

    #[test]
    fn images_are_checked() {
        let max = 5 * 1024 * 1024;
        assert!(validate_image("a.png", Some("image/png"), 10, max).is_ok());
        assert!(validate_image("a.txt", Some("text/plain"), 10, max).is_err());
        assert!(validate_image("a.png", None, 10, max).is_err());
        assert!(validate_image("a.png", Some("image/png"), max + 1, max).is_err());
    }

    #[tokio::test]
    async fn upload_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path(), "http://localhost:3000");
        storage.init().await.unwrap();

        let stored = storage
            .upload(MARKETPLACE_BUCKET, "user-1", "desk.jpg", b"jpeg")
            .await
            .unwrap();
        assert!(stored.path.starts_with("user-1/"));
        assert!(stored.path.ends_with("-desk.jpg"));

        let on_disk = storage.object_path(MARKETPLACE_BUCKET, &stored.path).unwrap();
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"jpeg");

        storage.remove(MARKETPLACE_BUCKET, &stored.path).await.unwrap();
        assert!(!on_disk.exists());
        storage.remove(MARKETPLACE_BUCKET, &stored.path).await.unwrap();
    }
}
