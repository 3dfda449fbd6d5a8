pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    db::Database,
    services::{
        applications::ApplicationManager, lifecycle::ProjectStatusController,
        marketplace::MarketplaceService, messages::MessageService, realtime::RoomRegistry,
        storage::StorageService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub rooms: RoomRegistry,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let storage = StorageService::new(&config.storage_path, &config.public_base_url);
        Self {
            db,
            config,
            rooms: RoomRegistry::new(),
            storage,
        }
    }

    pub fn lifecycle(&self) -> ProjectStatusController {
        ProjectStatusController::new(self.db.pool.clone())
    }

    pub fn applications(&self) -> ApplicationManager {
        ApplicationManager::new(self.db.pool.clone())
    }

    pub fn messages(&self) -> MessageService {
        MessageService::new(self.db.pool.clone(), self.rooms.clone())
    }

    pub fn marketplace(&self) -> MarketplaceService {
        MarketplaceService::new(
            self.db.pool.clone(),
            self.storage.clone(),
            self.config.max_images,
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.upload_body_limit();

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .nest("/profiles", routes::profiles::router())
        .nest("/projects", routes::projects::router())
        .nest("/applications", routes::applications::router())
        .nest("/messages", routes::messages::router())
        .nest("/marketplace", routes::marketplace::router())
        .nest("/uploads", routes::uploads::router(upload_limit))
        .nest("/dashboard", routes::dashboard::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected_routes);

    let storage_dir = ServeDir::new(state.storage.base_path());

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(handlers::ws::ws_handler))
        .nest("/api", api_router)
        .nest_service("/storage", storage_dir)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
