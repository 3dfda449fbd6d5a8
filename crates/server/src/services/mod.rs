pub mod applications;
pub mod lifecycle;
pub mod marketplace;
pub mod messages;
pub mod realtime;
pub mod storage;

use sqlx::SqlitePool;

use crate::{
    db::models::{Application, Project, APPLICATION_COLUMNS, PROJECT_COLUMNS},
    error::{AppError, Result},
};

pub async fn fetch_project(pool: &SqlitePool, project_id: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}

pub async fn fetch_application(pool: &SqlitePool, application_id: &str) -> Result<Application> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?"
    ))
    .bind(application_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
}

pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
