use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::models::Application, error::Result, middleware::auth::AuthUser,
    services::applications::ApplicationWithProject, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(my_applications))
        .route("/:id", get(get_application))
        .route("/:id/reject", post(reject_application))
}

#[derive(Debug, Serialize)]
pub struct MyApplicationsResponse {
    pub applications: Vec<ApplicationWithProject>,
}

async fn my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MyApplicationsResponse>> {
    let applications = state.applications().list_for_freelancer(&user.id).await?;
    Ok(Json(MyApplicationsResponse { applications }))
}

async fn get_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Application>> {
    let application = state.applications().get(&id, &user.id).await?;
    Ok(Json(application))
}

async fn reject_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Application>> {
    let application = state.lifecycle().reject_application(&id, &user.id).await?;
    Ok(Json(application))
}
