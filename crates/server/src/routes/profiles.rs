use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;

use crate::{
    db::{models::Profile, timestamp},
    domain::validation,
    error::{AppError, Result},
    middleware::auth::AuthUser,
    AppState,
};

const PROFILE_COLUMNS: &str = "id, username, full_name, bio, location, hourly_rate, skills, \
     avatar_url, is_student, student_id, institution, graduation_year, major, created_at, updated_at";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_own_profile).put(update_own_profile))
        .route("/:id", get(get_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_student: bool,
    pub student_id: Option<String>,
    pub institution: Option<String>,
    pub graduation_year: Option<i64>,
    pub major: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Vec<String>,
    pub avatar_url: Option<String>,
    pub is_student: bool,
    pub student_id: Option<String>,
    pub institution: Option<String>,
    pub graduation_year: Option<i64>,
    pub major: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            full_name: p.full_name,
            bio: p.bio,
            location: p.location,
            hourly_rate: p.hourly_rate,
            skills: p.skills.0,
            avatar_url: p.avatar_url,
            is_student: p.is_student,
            student_id: p.student_id,
            institution: p.institution,
            graduation_year: p.graduation_year,
            major: p.major,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

async fn fetch_profile(state: &AppState, id: &str) -> Result<Profile> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}

async fn get_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>> {
    let profile = fetch_profile(&state, &user.id).await?;
    Ok(Json(profile.into()))
}

async fn get_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let profile = fetch_profile(&state, &id).await?;
    Ok(Json(profile.into()))
}

async fn update_own_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    validation::non_negative(body.hourly_rate, "Hourly rate")?;
    if let Some(year) = body.graduation_year {
        if !(1900..=2100).contains(&year) {
            return Err(AppError::Validation(
                "Graduation year must be between 1900 and 2100".to_string(),
            ));
        }
    }

    let skills = validation::normalize_skills(body.skills);
    let now = timestamp();

    sqlx::query(
        r#"
        INSERT INTO profiles (id, username, full_name, bio, location, hourly_rate, skills,
            avatar_url, is_student, student_id, institution, graduation_year, major,
            created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            full_name = excluded.full_name,
            bio = excluded.bio,
            location = excluded.location,
            hourly_rate = excluded.hourly_rate,
            skills = excluded.skills,
            avatar_url = excluded.avatar_url,
            is_student = excluded.is_student,
            student_id = excluded.student_id,
            institution = excluded.institution,
            graduation_year = excluded.graduation_year,
            major = excluded.major,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&user.id)
    .bind(validation::optional(body.username))
    .bind(validation::optional(body.full_name))
    .bind(validation::optional(body.bio))
    .bind(validation::optional(body.location))
    .bind(body.hourly_rate)
    .bind(SqlJson(&skills))
    .bind(validation::optional(body.avatar_url))
    .bind(body.is_student)
    .bind(validation::optional(body.student_id))
    .bind(validation::optional(body.institution))
    .bind(body.graduation_year)
    .bind(validation::optional(body.major))
    .bind(&now)
    .execute(&state.db.pool)
    .await?;

    tracing::debug!(user_id = %user.id, "profile updated");

    let profile = fetch_profile(&state, &user.id).await?;
    Ok(Json(profile.into()))
}
