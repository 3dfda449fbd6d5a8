use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{fetch_project, realtime::RoomRegistry};
use crate::{
    db::{
        models::{Message, Project},
        timestamp,
    },
    domain::{validation, ProjectStatus, ViewerRole},
    error::{AppError, Result},
};

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub project_id: String,
    pub title: String,
    pub status: ProjectStatus,
    pub client_id: String,
    pub freelancer_id: String,
    pub role: ViewerRole,
    pub partner_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    title: String,
    status: ProjectStatus,
    client_id: String,
    freelancer_id: String,
    client_name: Option<String>,
    freelancer_name: Option<String>,
}

#[derive(Clone)]
pub struct MessageService {
    pool: SqlitePool,
    rooms: RoomRegistry,
}

impl MessageService {
    pub fn new(pool: SqlitePool, rooms: RoomRegistry) -> Self {
        Self { pool, rooms }
    }

    pub async fn authorize(&self, project_id: &str, viewer_id: &str) -> Result<Project> {
        let project = fetch_project(&self.pool, project_id).await?;

        if !project.is_participant(viewer_id) {
            return Err(AppError::Forbidden(
                "Only the project's client and assigned freelancer can access its messages"
                    .to_string(),
            ));
        }
        if !project.status.has_freelancer() {
            return Err(AppError::Conflict(
                "Messaging opens once a freelancer is assigned".to_string(),
            ));
        }

        Ok(project)
    }

    pub async fn conversations(&self, viewer_id: &str) -> Result<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT p.id, p.title, p.status, p.client_id, p.freelancer_id,
                   c.full_name AS client_name, f.full_name AS freelancer_name
            FROM projects p
            JOIN profiles c ON c.id = p.client_id
            JOIN profiles f ON f.id = p.freelancer_id
            WHERE (p.client_id = ? OR p.freelancer_id = ?)
              AND p.freelancer_id IS NOT NULL
              AND p.status IN ('assigned', 'in_progress', 'review', 'revision', 'completed')
            ORDER BY p.updated_at DESC
            "#,
        )
        .bind(viewer_id)
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let role = ViewerRole::of(viewer_id, &row.client_id, Some(&row.freelancer_id));
                let partner_name = match role {
                    ViewerRole::Client => row.freelancer_name,
                    _ => row.client_name,
                };
                Conversation {
                    project_id: row.id,
                    title: row.title,
                    status: row.status,
                    client_id: row.client_id,
                    freelancer_id: row.freelancer_id,
                    role,
                    partner_name,
                }
            })
            .collect())
    }

    pub async fn list(&self, project_id: &str, viewer_id: &str) -> Result<Vec<Message>> {
        self.authorize(project_id, viewer_id).await?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.id, m.project_id, m.sender_id, p.full_name AS sender_name, m.content, m.created_at
            FROM messages m
            LEFT JOIN profiles p ON p.id = m.sender_id
            WHERE m.project_id = ?
            ORDER BY m.created_at ASC, m.rowid ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn send(&self, project_id: &str, sender_id: &str, content: &str) -> Result<Message> {
        let content = validation::required(content, "Message")?;
        self.authorize(project_id, sender_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO messages (id, project_id, sender_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(sender_id)
        .bind(&content)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let sender_name =
            sqlx::query_scalar::<_, Option<String>>("SELECT full_name FROM profiles WHERE id = ?")
                .bind(sender_id)
                .fetch_optional(&self.pool)
                .await?
                .flatten();

        let message = Message {
            id,
            project_id: project_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name,
            content,
            created_at: now,
        };

        let delivered = self.rooms.publish(message.clone()).await;
        tracing::debug!(message_id = %message.id, project_id, delivered, "message stored");

        Ok(message)
    }
}
