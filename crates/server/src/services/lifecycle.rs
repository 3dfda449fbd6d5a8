// Project status changes, written as compare-and-set on the status read

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::SqlitePool;

use super::{conflict_on_unique, fetch_application, fetch_project};
use crate::{
    db::{
        models::{Application, Project},
        timestamp,
    },
    domain::{
        lifecycle::{self, TransitionError},
        ApplicationStatus, LifecycleAction, ProjectStatus, ViewerRole,
    },
    error::{AppError, Result},
};

#[derive(Debug, Clone, Serialize)]
pub struct PermittedActions {
    pub status: ProjectStatus,
    pub role: ViewerRole,
    pub actions: BTreeSet<LifecycleAction>,
}

#[derive(Debug, Clone)]
pub struct Acceptance {
    pub project: Project,
    pub application: Application,
    pub rejected: u64,
}

#[derive(Clone)]
pub struct ProjectStatusController {
    pool: SqlitePool,
}

impl ProjectStatusController {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn permitted_actions(
        &self,
        project_id: &str,
        viewer_id: &str,
    ) -> Result<PermittedActions> {
        let project = fetch_project(&self.pool, project_id).await?;
        let role = project.viewer_role(viewer_id);

        Ok(PermittedActions {
            status: project.status,
            role,
            actions: lifecycle::permitted_actions(project.status, role),
        })
    }

    pub async fn update_status(
        &self,
        project_id: &str,
        viewer_id: &str,
        new_status: ProjectStatus,
        note: Option<&str>,
    ) -> Result<Project> {
        let project = fetch_project(&self.pool, project_id).await?;
        self.transition(project, viewer_id, new_status, note).await
    }

    pub async fn apply_action(
        &self,
        project_id: &str,
        viewer_id: &str,
        action: LifecycleAction,
        note: Option<&str>,
    ) -> Result<Project> {
        let project = fetch_project(&self.pool, project_id).await?;

        if project.status != action.from_status() {
            return Err(TransitionError::NotAllowed {
                from: project.status,
                to: action.target(),
            }
            .into());
        }

        self.transition(project, viewer_id, action.target(), note)
            .await
    }

    async fn transition(
        &self,
        project: Project,
        viewer_id: &str,
        new_status: ProjectStatus,
        note: Option<&str>,
    ) -> Result<Project> {
        let role = project.viewer_role(viewer_id);
        let action = lifecycle::check_transition(project.status, new_status, role, note)?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        let result = sqlx::query(
            "UPDATE projects SET status = ?, review_note = COALESCE(?, review_note), updated_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(new_status)
        .bind(note)
        .bind(timestamp())
        .bind(&project.id)
        .bind(project.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Project status was changed by someone else; reload and try again".to_string(),
            ));
        }

        tracing::info!(
            project_id = %project.id,
            from = %project.status,
            to = %new_status,
            ?action,
            "project status updated"
        );

        fetch_project(&self.pool, &project.id).await
    }

    // Accept, assign and reject siblings in one transaction.
    pub async fn accept_application(
        &self,
        application_id: &str,
        project_id: &str,
        viewer_id: &str,
    ) -> Result<Acceptance> {
        let project = fetch_project(&self.pool, project_id).await?;
        if project.client_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the project's client can accept applications".to_string(),
            ));
        }

        let application = fetch_application(&self.pool, application_id).await?;
        if application.project_id != project.id {
            return Err(AppError::NotFound(
                "Application not found for this project".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Application is already {}",
                application.status.as_str()
            )));
        }
        if project.status != ProjectStatus::Open {
            return Err(AppError::Conflict(
                "Project is no longer accepting applications".to_string(),
            ));
        }

        // Dropping the transaction on an early return rolls back every write.
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query(
            "UPDATE applications SET status = 'accepted' \
             WHERE id = ? AND project_id = ? AND status = 'pending'",
        )
        .bind(&application.id)
        .bind(&project.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Project already has an accepted application"))?;

        if accepted.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Application is no longer pending".to_string(),
            ));
        }

        let assigned = sqlx::query(
            "UPDATE projects SET status = 'assigned', freelancer_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'open'",
        )
        .bind(&application.freelancer_id)
        .bind(timestamp())
        .bind(&project.id)
        .execute(&mut *tx)
        .await?;

        if assigned.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Project has already been assigned".to_string(),
            ));
        }

        let rejected = sqlx::query(
            "UPDATE applications SET status = 'rejected' \
             WHERE project_id = ? AND id <> ? AND status <> 'rejected'",
        )
        .bind(&project.id)
        .bind(&application.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            project_id = %project.id,
            application_id = %application.id,
            freelancer_id = %application.freelancer_id,
            rejected,
            "application accepted"
        );

        Ok(Acceptance {
            project: fetch_project(&self.pool, &project.id).await?,
            application: fetch_application(&self.pool, &application.id).await?,
            rejected,
        })
    }

    // Rejecting a rejected application is a no-op.
    pub async fn reject_application(
        &self,
        application_id: &str,
        viewer_id: &str,
    ) -> Result<Application> {
        let application = fetch_application(&self.pool, application_id).await?;
        let project = fetch_project(&self.pool, &application.project_id).await?;

        if project.client_id != viewer_id {
            return Err(AppError::Forbidden(
                "Only the project's client can reject applications".to_string(),
            ));
        }

        match application.status {
            ApplicationStatus::Rejected => return Ok(application),
            ApplicationStatus::Accepted => {
                return Err(AppError::Conflict(
                    "An accepted application cannot be rejected".to_string(),
                ))
            }
            ApplicationStatus::Pending => {}
        }

        sqlx::query("UPDATE applications SET status = 'rejected' WHERE id = ? AND status = 'pending'")
            .bind(&application.id)
            .execute(&self.pool)
            .await?;

        let current = fetch_application(&self.pool, &application.id).await?;
        if current.status == ApplicationStatus::Accepted {
            return Err(AppError::Conflict(
                "Application was accepted before it could be rejected".to_string(),
            ));
        }

        tracing::info!(application_id = %current.id, project_id = %current.project_id, "application rejected");
        Ok(current)
    }
}
