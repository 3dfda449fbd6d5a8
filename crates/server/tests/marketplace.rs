mod common;

use collabhub_server::{
    domain::{ItemCondition, ItemStatus},
    error::AppError,
    services::{
        marketplace::{ItemFilter, ItemInput, MarketplaceService},
        storage::{StorageService, MARKETPLACE_BUCKET},
    },
};
use common::{create_user, test_db};
use tempfile::TempDir;

fn item(title: &str, category: &str) -> ItemInput {
    ItemInput {
        title: title.to_string(),
        description: Some("Barely used".to_string()),
        price: 25.0,
        category: Some(category.to_string()),
        condition: ItemCondition::LikeNew,
        location: Some("Campus library".to_string()),
        images: Vec::new(),
    }
}

async fn storage(dir: &TempDir) -> StorageService {
    let storage = StorageService::new(dir.path(), "http://localhost:3000");
    storage.init().await.unwrap();
    storage
}

#[tokio::test]
async fn selling_twice_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;
    let buyer = create_user(&db, "Buyer").await;

    let service = MarketplaceService::new(db.pool.clone(), storage(&dir).await, 5);
    let listed = service.create(&seller, item("Desk lamp", "furniture")).await.unwrap();
    assert_eq!(listed.status, ItemStatus::Available);

    let sold = service
        .mark_sold(&listed.id, &seller, Some(&buyer))
        .await
        .unwrap();
    assert_eq!(sold.status, ItemStatus::Sold);
    assert_eq!(sold.buyer_id.as_deref(), Some(buyer.as_str()));

    let result = service.mark_sold(&listed.id, &seller, None).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn only_the_seller_changes_a_listing() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;
    let other = create_user(&db, "Other").await;

    let service = MarketplaceService::new(db.pool.clone(), storage(&dir).await, 5);
    let listed = service.create(&seller, item("Bike", "sports")).await.unwrap();

    let result = service.mark_sold(&listed.id, &other, None).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = service.update(&listed.id, &other, item("Cheap bike", "sports")).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = service.delete(&listed.id, &other).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = service.mark_sold(&listed.id, &seller, Some(&seller)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn listing_filters_by_search_and_category() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;

    let service = MarketplaceService::new(db.pool.clone(), storage(&dir).await, 5);
    service.create(&seller, item("Calculus textbook", "books")).await.unwrap();
    service.create(&seller, item("Office chair", "furniture")).await.unwrap();
    let sold = service.create(&seller, item("Physics textbook", "books")).await.unwrap();
    service.mark_sold(&sold.id, &seller, None).await.unwrap();

    let all = service.list_available(&ItemFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].title, "Office chair");

    let books = service
        .list_available(&ItemFilter {
            search: Some("TEXTBOOK".to_string()),
            category: Some("all".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Calculus textbook");

    let furniture = service
        .list_available(&ItemFilter {
            search: None,
            category: Some("furniture".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(furniture.len(), 1);
}

#[tokio::test]
async fn too_many_images_are_rejected() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;

    let service = MarketplaceService::new(db.pool.clone(), storage(&dir).await, 2);
    let mut input = item("Camera", "electronics");
    input.images = vec!["a".into(), "b".into(), "c".into()];

    let result = service.create(&seller, input).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn deleting_a_listing_removes_its_images() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;

    let storage = storage(&dir).await;
    let object = storage
        .upload(MARKETPLACE_BUCKET, &seller, "lamp.png", b"png-bytes")
        .await
        .unwrap();
    let file = storage.object_path(MARKETPLACE_BUCKET, &object.path).unwrap();
    assert!(file.exists());

    let service = MarketplaceService::new(db.pool.clone(), storage, 5);
    let mut input = item("Lamp", "furniture");
    input.images = vec![object.url.clone()];
    let listed = service.create(&seller, input).await.unwrap();
    assert_eq!(listed.images.0, vec![object.url]);

    service.delete(&listed.id, &seller).await.unwrap();

    assert!(!file.exists());
    let result = service.get(&listed.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn listings_cannot_claim_or_delete_other_sellers_uploads() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let owner = create_user(&db, "Owner").await;
    let other = create_user(&db, "Other").await;

    let storage = storage(&dir).await;
    let object = storage
        .upload(MARKETPLACE_BUCKET, &owner, "bike.png", b"png-bytes")
        .await
        .unwrap();
    let file = storage.object_path(MARKETPLACE_BUCKET, &object.path).unwrap();

    let service = MarketplaceService::new(db.pool.clone(), storage, 5);

    let mut input = item("Bike", "sports");
    input.images = vec![object.url.clone()];
    let result = service.create(&other, input).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let listed = service.create(&other, item("Helmet", "sports")).await.unwrap();
    let mut input = item("Helmet", "sports");
    input.images = vec![object.url.clone()];
    let result = service.update(&listed.id, &other, input).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // A row that already points at someone else's upload keeps that file.
    sqlx::query("UPDATE marketplace_items SET images = ? WHERE id = ?")
        .bind(serde_json::json!([object.url]).to_string())
        .bind(&listed.id)
        .execute(&db.pool)
        .await
        .unwrap();
    service.delete(&listed.id, &other).await.unwrap();
    assert!(file.exists());
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let dir = TempDir::new().unwrap();
    let db = test_db().await;
    let seller = create_user(&db, "Seller").await;

    let service = MarketplaceService::new(db.pool.clone(), storage(&dir).await, 5);
    service.create(&seller, item("Jacket 50% off", "clothing")).await.unwrap();
    service.create(&seller, item("Jacket 500 new", "clothing")).await.unwrap();
    service.create(&seller, item("snow_boots", "clothing")).await.unwrap();
    service.create(&seller, item("snowXboots", "clothing")).await.unwrap();

    let percent = service
        .list_available(&ItemFilter {
            search: Some("50%".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "Jacket 50% off");

    let underscore = service
        .list_available(&ItemFilter {
            search: Some("snow_".to_string()),
            category: None,
        })
        .await
        .unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].title, "snow_boots");
}
