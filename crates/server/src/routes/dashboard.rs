use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{error::Result, middleware::auth::AuthUser, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(summary))
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub client_projects: BTreeMap<String, i64>,
    pub freelancer_projects: BTreeMap<String, i64>,
    pub applications: BTreeMap<String, i64>,
}

async fn counts_by_status(pool: &SqlitePool, sql: &str, user_id: &str) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query_as::<_, (String, i64)>(sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn summary(State(state): State<AppState>, user: AuthUser) -> Result<Json<DashboardSummary>> {
    let pool = &state.db.pool;

    let client_projects = counts_by_status(
        pool,
        "SELECT status, COUNT(*) FROM projects WHERE client_id = ? GROUP BY status",
        &user.id,
    )
    .await?;
    let freelancer_projects = counts_by_status(
        pool,
        "SELECT status, COUNT(*) FROM projects WHERE freelancer_id = ? GROUP BY status",
        &user.id,
    )
    .await?;
    let applications = counts_by_status(
        pool,
        "SELECT status, COUNT(*) FROM applications WHERE freelancer_id = ? GROUP BY status",
        &user.id,
    )
    .await?;

    Ok(Json(DashboardSummary {
        client_projects,
        freelancer_projects,
        applications,
    }))
}
