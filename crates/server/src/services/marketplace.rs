use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use super::storage::{StorageService, MARKETPLACE_BUCKET};
use crate::{
    db::{
        models::{MarketplaceItem, ITEM_COLUMNS},
        timestamp,
    },
    domain::{validation, ItemCondition, ItemStatus},
    error::{AppError, Result},
};

#[derive(Debug, Clone)]
pub struct ItemInput {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub location: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct MarketplaceService {
    pool: SqlitePool,
    storage: StorageService,
    max_images: usize,
}

impl MarketplaceService {
    pub fn new(pool: SqlitePool, storage: StorageService, max_images: usize) -> Self {
        Self {
            pool,
            storage,
            max_images,
        }
    }

    fn validate(&self, seller_id: &str, input: ItemInput) -> Result<ItemInput> {
        let title = validation::required(&input.title, "Title")?;
        validation::non_negative(Some(input.price), "Price")?;
        if input.images.len() > self.max_images {
            return Err(AppError::Validation(format!(
                "You can only attach up to {} images",
                self.max_images
            )));
        }
        // Images in our own bucket must be the seller's uploads.
        for url in &input.images {
            if self.storage.path_from_url(MARKETPLACE_BUCKET, url).is_some()
                && self.seller_upload(seller_id, url).is_none()
            {
                return Err(AppError::Forbidden(
                    "You can only attach images you uploaded".to_string(),
                ));
            }
        }

        Ok(ItemInput {
            title,
            description: validation::optional(input.description),
            category: validation::optional(input.category),
            location: validation::optional(input.location),
            ..input
        })
    }

    fn seller_upload<'a>(&self, seller_id: &str, url: &'a str) -> Option<&'a str> {
        self.storage
            .path_from_url(MARKETPLACE_BUCKET, url)
            .filter(|path| path.starts_with(&format!("{seller_id}/")))
    }

    pub async fn get(&self, item_id: &str) -> Result<MarketplaceItem> {
        sqlx::query_as::<_, MarketplaceItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM marketplace_items WHERE id = ?"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    async fn owned(&self, item_id: &str, seller_id: &str) -> Result<MarketplaceItem> {
        let item = self.get(item_id).await?;
        if item.seller_id != seller_id {
            return Err(AppError::Forbidden(
                "Only the seller can change this listing".to_string(),
            ));
        }
        Ok(item)
    }

    pub async fn create(&self, seller_id: &str, input: ItemInput) -> Result<MarketplaceItem> {
        let input = self.validate(seller_id, input)?;
        let id = Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            r#"
            INSERT INTO marketplace_items
                (id, seller_id, title, description, price, category, condition, location, images, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'available', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(seller_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.category)
        .bind(input.condition)
        .bind(&input.location)
        .bind(Json(&input.images))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::info!(item_id = %id, seller_id, "marketplace item listed");
        self.get(&id).await
    }

    pub async fn list_available(&self, filter: &ItemFilter) -> Result<Vec<MarketplaceItem>> {
        let pattern = validation::like_pattern(filter.search.as_deref());
        let category = filter.category.as_deref().filter(|c| *c != "all");

        let items = sqlx::query_as::<_, MarketplaceItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM marketplace_items
            WHERE status = 'available'
              AND (?1 IS NULL OR lower(title) LIKE ?1 ESCAPE '\' OR lower(coalesce(description, '')) LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR category = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#
        ))
        .bind(pattern)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn update(
        &self,
        item_id: &str,
        seller_id: &str,
        input: ItemInput,
    ) -> Result<MarketplaceItem> {
        let existing = self.owned(item_id, seller_id).await?;
        if existing.status == ItemStatus::Sold {
            return Err(AppError::Conflict("Sold items cannot be edited".to_string()));
        }
        let input = self.validate(seller_id, input)?;

        sqlx::query(
            r#"
            UPDATE marketplace_items
            SET title = ?, description = ?, price = ?, category = ?, condition = ?, location = ?, images = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.category)
        .bind(input.condition)
        .bind(&input.location)
        .bind(Json(&input.images))
        .bind(timestamp())
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        self.get(item_id).await
    }

    pub async fn mark_sold(
        &self,
        item_id: &str,
        seller_id: &str,
        buyer_id: Option<&str>,
    ) -> Result<MarketplaceItem> {
        self.owned(item_id, seller_id).await?;
        if buyer_id == Some(seller_id) {
            return Err(AppError::Validation(
                "The buyer must be someone other than the seller".to_string(),
            ));
        }
        if let Some(buyer_id) = buyer_id {
            let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE id = ?")
                .bind(buyer_id)
                .fetch_one(&self.pool)
                .await?;
            if known == 0 {
                return Err(AppError::Validation("Unknown buyer".to_string()));
            }
        }

        let result = sqlx::query(
            "UPDATE marketplace_items SET status = 'sold', buyer_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'available'",
        )
        .bind(buyer_id)
        .bind(timestamp())
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Item has already been sold".to_string()));
        }

        tracing::info!(item_id, seller_id, ?buyer_id, "marketplace item sold");
        self.get(item_id).await
    }

    // Removes the listing and the seller's own uploads it points at.
    pub async fn delete(&self, item_id: &str, seller_id: &str) -> Result<()> {
        let item = self.owned(item_id, seller_id).await?;

        sqlx::query("DELETE FROM marketplace_items WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        for url in &item.images.0 {
            if let Some(path) = self.seller_upload(seller_id, url) {
                if let Err(e) = self.storage.remove(MARKETPLACE_BUCKET, path).await {
                    tracing::warn!(item_id, url = %url, error = %e, "failed to remove listing image");
                }
            }
        }

        Ok(())
    }
}
