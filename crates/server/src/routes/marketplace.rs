use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::MarketplaceItem,
    domain::{ItemCondition, ItemStatus},
    error::Result,
    middleware::auth::AuthUser,
    services::marketplace::{ItemFilter, ItemInput},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/:id/sold", post(mark_sold))
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub location: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<ItemRequest> for ItemInput {
    fn from(body: ItemRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            price: body.price,
            category: body.category,
            condition: body.condition,
            location: body.location,
            images: body.images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkSoldRequest {
    pub buyer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub location: Option<String>,
    pub images: Vec<String>,
    pub status: ItemStatus,
    pub buyer_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MarketplaceItem> for ItemResponse {
    fn from(item: MarketplaceItem) -> Self {
        Self {
            id: item.id,
            seller_id: item.seller_id,
            title: item.title,
            description: item.description,
            price: item.price,
            category: item.category,
            condition: item.condition,
            location: item.location,
            images: item.images.0,
            status: item.status,
            buyer_id: item.buyer_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
}

async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ItemListResponse>> {
    let filter = ItemFilter {
        search: query.search,
        category: query.category,
    };
    let items = state.marketplace().list_available(&filter).await?;
    Ok(Json(ItemListResponse {
        items: items.into_iter().map(Into::into).collect(),
    }))
}

async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ItemRequest>,
) -> Result<Json<ItemResponse>> {
    let item = state.marketplace().create(&user.id, body.into()).await?;
    Ok(Json(item.into()))
}

async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>> {
    let item = state.marketplace().get(&id).await?;
    Ok(Json(item.into()))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ItemRequest>,
) -> Result<Json<ItemResponse>> {
    let item = state.marketplace().update(&id, &user.id, body.into()).await?;
    Ok(Json(item.into()))
}

async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<()>> {
    state.marketplace().delete(&id, &user.id).await?;
    Ok(Json(()))
}

async fn mark_sold(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<MarkSoldRequest>>,
) -> Result<Json<ItemResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let item = state
        .marketplace()
        .mark_sold(&id, &user.id, body.buyer_id.as_deref())
        .await?;
    Ok(Json(item.into()))
}
