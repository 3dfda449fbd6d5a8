use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage_path: String,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub max_images: usize,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let max_image_mb: usize = env::var("MAX_IMAGE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/collabhub.db?mode=rwc".to_string()),
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-change-in-production".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_images: env::var("MAX_IMAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            max_image_bytes: max_image_mb.saturating_mul(1024 * 1024),
        }
    }

    // Room for every allowed image plus multipart framing.
    pub fn upload_body_limit(&self) -> usize {
        self.max_images
            .saturating_mul(self.max_image_bytes)
            .saturating_add(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_images: usize, max_image_bytes: usize) -> Config {
        Config {
            port: 0,
            database_url: String::new(),
            storage_path: String::new(),
            jwt_secret: String::new(),
            public_base_url: String::new(),
            max_images,
            max_image_bytes,
        }
    }

    #[test]
    fn upload_limit_covers_every_image() {
        assert_eq!(config(5, 1024).upload_body_limit(), 5 * 1024 + 64 * 1024);
    }

    #[test]
    fn upload_limit_saturates_on_huge_values() {
        assert_eq!(config(usize::MAX, usize::MAX).upload_body_limit(), usize::MAX);
    }
}
