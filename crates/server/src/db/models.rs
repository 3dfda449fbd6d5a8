use serde::Serialize;
use sqlx::types::Json;

use crate::domain::{ApplicationStatus, ItemCondition, ItemStatus, ProjectStatus, ViewerRole};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Json<Vec<String>>,
    pub avatar_url: Option<String>,
    pub is_student: bool,
    pub student_id: Option<String>,
    pub institution: Option<String>,
    pub graduation_year: Option<i64>,
    pub major: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub deadline: Option<String>,
    pub skills_required: Json<Vec<String>>,
    pub status: ProjectStatus,
    pub client_id: String,
    pub freelancer_id: Option<String>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    pub fn viewer_role(&self, viewer_id: &str) -> ViewerRole {
        ViewerRole::of(viewer_id, &self.client_id, self.freelancer_id.as_deref())
    }

    pub fn is_participant(&self, viewer_id: &str) -> bool {
        self.viewer_role(viewer_id) != ViewerRole::Other
    }
}

pub const PROJECT_COLUMNS: &str = "id, title, description, category, budget_min, budget_max, \
     deadline, skills_required, status, client_id, freelancer_id, review_note, created_at, updated_at";

pub fn project_columns(alias: &str) -> String {
    PROJECT_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: String,
    pub project_id: String,
    pub freelancer_id: String,
    pub proposal: String,
    pub bid_amount: f64,
    pub estimated_duration: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: String,
}

pub const APPLICATION_COLUMNS: &str =
    "id, project_id, freelancer_id, proposal, bid_amount, estimated_duration, status, created_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub project_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketplaceItem {
    pub id: String,
    pub seller_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub location: Option<String>,
    pub images: Json<Vec<String>>,
    pub status: ItemStatus,
    pub buyer_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub const ITEM_COLUMNS: &str = "id, seller_id, title, description, price, category, condition, \
     location, images, status, buyer_id, created_at, updated_at";
