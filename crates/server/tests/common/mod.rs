#![allow(dead_code)]

use collabhub_server::{
    config::Config,
    db::{timestamp, Database},
    services::applications::NewApplication,
    AppState,
};
use uuid::Uuid;

pub async fn test_db() -> Database {
    Database::in_memory().await.unwrap()
}

pub fn test_config(storage_path: &str) -> Config {
    Config {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        storage_path: storage_path.to_string(),
        jwt_secret: "test-secret".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        max_images: 5,
        max_image_bytes: 5 * 1024 * 1024,
    }
}

pub async fn test_state(storage_path: &str) -> AppState {
    let state = AppState::new(test_db().await, test_config(storage_path));
    state.storage.init().await.unwrap();
    state
}

// Account and profile share the returned id.
pub async fn create_user(db: &Database, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = timestamp();

    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, 'x', ?)")
        .bind(&id)
        .bind(format!("{id}@example.com"))
        .bind(&now)
        .execute(&db.pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO profiles (id, full_name, skills, created_at, updated_at) VALUES (?, ?, '[]', ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(&db.pool)
    .await
    .unwrap();

    id
}

pub async fn create_project(db: &Database, client_id: &str, title: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let now = timestamp();

    sqlx::query(
        r#"
        INSERT INTO projects (id, title, description, category, budget_min, budget_max,
            skills_required, status, client_id, created_at, updated_at)
        VALUES (?, ?, 'Build it', 'web', 100, 500, '["React","Node"]', 'open', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(client_id)
    .bind(&now)
    .bind(&now)
    .execute(&db.pool)
    .await
    .unwrap();

    id
}

pub fn bid(amount: f64) -> NewApplication {
    NewApplication {
        proposal: "I can do this".to_string(),
        bid_amount: amount,
        estimated_duration: Some("2 weeks".to_string()),
    }
}
