use serde::Serialize;
use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use super::{conflict_on_unique, fetch_application, fetch_project};
use crate::{
    db::{models::Application, timestamp},
    domain::{validation, ApplicationStatus, ProjectStatus},
    error::{AppError, Result},
};

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub proposal: String,
    pub bid_amount: f64,
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreelancerSummary {
    pub id: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithFreelancer {
    #[serde(flatten)]
    pub application: Application,
    pub freelancer: FreelancerSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub status: ProjectStatus,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithProject {
    #[serde(flatten)]
    pub application: Application,
    pub project: ProjectSummary,
}

#[derive(sqlx::FromRow)]
struct FreelancerRow {
    id: String,
    project_id: String,
    freelancer_id: String,
    proposal: String,
    bid_amount: f64,
    estimated_duration: Option<String>,
    status: ApplicationStatus,
    created_at: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    skills: Json<Vec<String>>,
    hourly_rate: Option<f64>,
    location: Option<String>,
}

impl From<FreelancerRow> for ApplicationWithFreelancer {
    fn from(row: FreelancerRow) -> Self {
        Self {
            freelancer: FreelancerSummary {
                id: row.freelancer_id.clone(),
                full_name: row.full_name,
                avatar_url: row.avatar_url,
                bio: row.bio,
                skills: row.skills.0,
                hourly_rate: row.hourly_rate,
                location: row.location,
            },
            application: Application {
                id: row.id,
                project_id: row.project_id,
                freelancer_id: row.freelancer_id,
                proposal: row.proposal,
                bid_amount: row.bid_amount,
                estimated_duration: row.estimated_duration,
                status: row.status,
                created_at: row.created_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    project_id: String,
    freelancer_id: String,
    proposal: String,
    bid_amount: f64,
    estimated_duration: Option<String>,
    status: ApplicationStatus,
    created_at: String,
    title: String,
    project_status: ProjectStatus,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    client_id: String,
}

impl From<ProjectRow> for ApplicationWithProject {
    fn from(row: ProjectRow) -> Self {
        Self {
            project: ProjectSummary {
                id: row.project_id.clone(),
                title: row.title,
                status: row.project_status,
                budget_min: row.budget_min,
                budget_max: row.budget_max,
                client_id: row.client_id,
            },
            application: Application {
                id: row.id,
                project_id: row.project_id,
                freelancer_id: row.freelancer_id,
                proposal: row.proposal,
                bid_amount: row.bid_amount,
                estimated_duration: row.estimated_duration,
                status: row.status,
                created_at: row.created_at,
            },
        }
    }
}

#[derive(Clone)]
pub struct ApplicationManager {
    pool: SqlitePool,
}

impl ApplicationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn submit(
        &self,
        project_id: &str,
        freelancer_id: &str,
        input: NewApplication,
    ) -> Result<Application> {
        let proposal = validation::required(&input.proposal, "Proposal")?;
        validation::positive(input.bid_amount, "Bid amount")?;
        let estimated_duration = validation::optional(input.estimated_duration);

        let project = fetch_project(&self.pool, project_id).await?;
        if project.client_id == freelancer_id {
            return Err(AppError::Forbidden(
                "You cannot apply to your own project".to_string(),
            ));
        }
        if project.status != ProjectStatus::Open {
            return Err(AppError::Conflict(
                "Project is no longer accepting applications".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, ApplicationStatus>(
            "SELECT status FROM applications WHERE project_id = ? AND freelancer_id = ?",
        )
        .bind(project_id)
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await?;
        if existing.into_iter().any(ApplicationStatus::is_active) {
            return Err(AppError::Conflict(
                "You have already applied to this project".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();

        // The status guard is repeated in the insert so a project that leaves
        // `open` after the read above cannot receive a bid.
        let result = sqlx::query(
            r#"
            INSERT INTO applications (id, project_id, freelancer_id, proposal, bid_amount, estimated_duration, status, created_at)
            SELECT ?, p.id, ?, ?, ?, ?, 'pending', ?
            FROM projects p
            WHERE p.id = ? AND p.status = 'open' AND p.client_id <> ?
            "#,
        )
        .bind(&id)
        .bind(freelancer_id)
        .bind(&proposal)
        .bind(input.bid_amount)
        .bind(&estimated_duration)
        .bind(timestamp())
        .bind(project_id)
        .bind(freelancer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already applied to this project"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Project is no longer accepting applications".to_string(),
            ));
        }

        tracing::info!(application_id = %id, project_id, freelancer_id, "application submitted");

        fetch_application(&self.pool, &id).await
    }

    pub async fn get(&self, application_id: &str, viewer_id: &str) -> Result<Application> {
        let application = fetch_application(&self.pool, application_id).await?;
        if application.freelancer_id != viewer_id {
            let project = fetch_project(&self.pool, &application.project_id).await?;
            if project.client_id != viewer_id {
                return Err(AppError::NotFound("Application not found".to_string()));
            }
        }
        Ok(application)
    }

    // The client sees every bid; anyone else only their own.
    pub async fn list_for_project(
        &self,
        project_id: &str,
        viewer_id: &str,
    ) -> Result<Vec<ApplicationWithFreelancer>> {
        let project = fetch_project(&self.pool, project_id).await?;
        let only_freelancer = (project.client_id != viewer_id).then_some(viewer_id);

        let rows = sqlx::query_as::<_, FreelancerRow>(
            r#"
            SELECT a.id, a.project_id, a.freelancer_id, a.proposal, a.bid_amount,
                   a.estimated_duration, a.status, a.created_at,
                   p.full_name, p.avatar_url, p.bio, p.skills, p.hourly_rate, p.location
            FROM applications a
            JOIN profiles p ON p.id = a.freelancer_id
            WHERE a.project_id = ? AND (? IS NULL OR a.freelancer_id = ?)
            ORDER BY a.created_at DESC, a.rowid DESC
            "#,
        )
        .bind(project_id)
        .bind(only_freelancer)
        .bind(only_freelancer)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_for_freelancer(
        &self,
        freelancer_id: &str,
    ) -> Result<Vec<ApplicationWithProject>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT a.id, a.project_id, a.freelancer_id, a.proposal, a.bid_amount,
                   a.estimated_duration, a.status, a.created_at,
                   p.title, p.status AS project_status, p.budget_min, p.budget_max, p.client_id
            FROM applications a
            JOIN projects p ON p.id = a.project_id
            WHERE a.freelancer_id = ?
            ORDER BY a.created_at DESC, a.rowid DESC
            "#,
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
