use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::Message,
    error::Result,
    middleware::auth::AuthUser,
    services::messages::Conversation,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route(
            "/project/:project_id",
            get(list_messages).post(send_message),
        )
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ConversationsResponse>> {
    let conversations = state.messages().conversations(&user.id).await?;
    Ok(Json(ConversationsResponse { conversations }))
}

async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<MessagesResponse>> {
    let messages = state.messages().list(&project_id, &user.id).await?;
    Ok(Json(MessagesResponse { messages }))
}

async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<Message>> {
    let message = state
        .messages()
        .send(&project_id, &user.id, &body.content)
        .await?;
    Ok(Json(message))
}
