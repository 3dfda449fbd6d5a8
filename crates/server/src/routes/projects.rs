use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::{
    db::{
        models::{project_columns, Application, Project},
        timestamp,
    },
    domain::{validation, LifecycleAction, ProjectStatus, ViewerRole},
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{
        applications::{ApplicationWithFreelancer, NewApplication},
        fetch_project,
        lifecycle::PermittedActions,
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(browse_projects).post(create_project))
        .route("/mine", get(my_projects))
        .route("/:id", get(get_project))
        .route("/:id/actions", get(permitted_actions))
        .route("/:id/lifecycle", post(apply_action))
        .route("/:id/status", put(update_status))
        .route(
            "/:id/applications",
            get(list_applications).post(submit_application),
        )
        .route(
            "/:id/applications/:application_id/accept",
            post(accept_application),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub skills_required: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub deadline: Option<String>,
    pub skills_required: Vec<String>,
    pub status: ProjectStatus,
    pub client_id: String,
    pub freelancer_id: Option<String>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            category: p.category,
            budget_min: p.budget_min,
            budget_max: p.budget_max,
            deadline: p.deadline,
            skills_required: p.skills_required.0,
            status: p.status,
            client_id: p.client_id,
            freelancer_id: p.freelancer_id,
            review_note: p.review_note,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectListing>,
}

#[derive(Debug, Serialize)]
pub struct ProjectListing {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub client_name: Option<String>,
    pub client_location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnProjectsResponse {
    pub projects: Vec<OwnProject>,
}

#[derive(Debug, Serialize)]
pub struct OwnProject {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub application_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub listing: ProjectListing,
    pub viewer_role: ViewerRole,
    pub can_apply: bool,
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    project: Project,
    client_name: Option<String>,
    client_location: Option<String>,
}

impl From<ListingRow> for ProjectListing {
    fn from(row: ListingRow) -> Self {
        Self {
            project: row.project.into(),
            client_name: row.client_name,
            client_location: row.client_location,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnProjectRow {
    #[sqlx(flatten)]
    project: Project,
    application_count: i64,
}

fn listing_query(filter: &str) -> String {
    let columns = project_columns("pr");
    format!(
        "SELECT {columns}, c.full_name AS client_name, c.location AS client_location \
         FROM projects pr JOIN profiles c ON c.id = pr.client_id {filter}"
    )
}

async fn browse_projects(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<ProjectListResponse>> {
    let pattern = validation::like_pattern(query.search.as_deref());
    let category = query.category.as_deref().filter(|c| *c != "all");

    let rows = sqlx::query_as::<_, ListingRow>(&listing_query(
        r#"
        WHERE pr.status = 'open'
          AND (?1 IS NULL OR lower(pr.title) LIKE ?1 ESCAPE '\' OR lower(pr.description) LIKE ?1 ESCAPE '\')
          AND (?2 IS NULL OR pr.category = ?2)
        ORDER BY pr.created_at DESC, pr.rowid DESC
        "#,
    ))
    .bind(pattern)
    .bind(category)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(ProjectListResponse {
        projects: rows.into_iter().map(Into::into).collect(),
    }))
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>> {
    let title = validation::required(&body.title, "Project title")?;
    let description = validation::required(&body.description, "Project description")?;
    validation::budget_range(body.budget_min, body.budget_max)?;
    let skills = validation::normalize_skills(body.skills_required);

    let project_id = Uuid::new_v4().to_string();
    let now = timestamp();

    sqlx::query(
        r#"
        INSERT INTO projects
            (id, title, description, category, budget_min, budget_max, deadline, skills_required, status, client_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'open', ?, ?, ?)
        "#,
    )
    .bind(&project_id)
    .bind(&title)
    .bind(&description)
    .bind(validation::optional(body.category))
    .bind(body.budget_min)
    .bind(body.budget_max)
    .bind(body.deadline.map(|d| d.to_string()))
    .bind(SqlJson(&skills))
    .bind(&user.id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db.pool)
    .await?;

    tracing::info!(project_id = %project_id, client_id = %user.id, "project posted");

    let project = fetch_project(&state.db.pool, &project_id).await?;
    Ok(Json(project.into()))
}

async fn my_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<OwnProjectsResponse>> {
    let columns = project_columns("p");

    let rows = sqlx::query_as::<_, OwnProjectRow>(&format!(
        r#"
        SELECT {columns}, COUNT(a.id) AS application_count
        FROM projects p
        LEFT JOIN applications a ON a.project_id = p.id
        WHERE p.client_id = ?
        GROUP BY p.id
        ORDER BY p.created_at DESC, p.rowid DESC
        "#
    ))
    .bind(&user.id)
    .fetch_all(&state.db.pool)
    .await?;

    let projects = rows
        .into_iter()
        .map(|row| OwnProject {
            project: row.project.into(),
            application_count: row.application_count,
        })
        .collect();

    Ok(Json(OwnProjectsResponse { projects }))
}

async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetailResponse>> {
    let row = sqlx::query_as::<_, ListingRow>(&listing_query("WHERE pr.id = ?"))
        .bind(&id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let viewer_role = row.project.viewer_role(&user.id);

    let has_applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM applications WHERE project_id = ? AND freelancer_id = ? AND status <> 'rejected'",
    )
    .bind(&id)
    .bind(&user.id)
    .fetch_one(&state.db.pool)
    .await?
        > 0;

    let can_apply =
        viewer_role == ViewerRole::Other && !has_applied && row.project.status == ProjectStatus::Open;

    Ok(Json(ProjectDetailResponse {
        listing: row.into(),
        viewer_role,
        can_apply,
    }))
}

async fn permitted_actions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PermittedActions>> {
    let actions = state.lifecycle().permitted_actions(&id, &user.id).await?;
    Ok(Json(actions))
}

#[derive(Debug, Deserialize)]
pub struct LifecycleRequest {
    pub action: LifecycleAction,
    pub note: Option<String>,
}

async fn apply_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<LifecycleRequest>,
) -> Result<Json<ProjectResponse>> {
    let project = state
        .lifecycle()
        .apply_action(&id, &user.id, body.action, body.note.as_deref())
        .await?;
    Ok(Json(project.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ProjectStatus,
    pub note: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ProjectResponse>> {
    let project = state
        .lifecycle()
        .update_status(&id, &user.id, body.status, body.note.as_deref())
        .await?;
    Ok(Json(project.into()))
}

#[derive(Debug, Serialize)]
pub struct ApplicationsListResponse {
    pub applications: Vec<ApplicationWithFreelancer>,
}

async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApplicationsListResponse>> {
    let applications = state.applications().list_for_project(&id, &user.id).await?;
    Ok(Json(ApplicationsListResponse { applications }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub proposal: String,
    pub bid_amount: f64,
    pub estimated_duration: Option<String>,
}

async fn submit_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<SubmitApplicationRequest>,
) -> Result<Json<Application>> {
    let application = state
        .applications()
        .submit(
            &id,
            &user.id,
            NewApplication {
                proposal: body.proposal,
                bid_amount: body.bid_amount,
                estimated_duration: body.estimated_duration,
            },
        )
        .await?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct AcceptPathParams {
    pub id: String,
    pub application_id: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub project: ProjectResponse,
    pub application: Application,
    pub rejected_count: u64,
}

async fn accept_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(params): Path<AcceptPathParams>,
) -> Result<Json<AcceptResponse>> {
    let acceptance = state
        .lifecycle()
        .accept_application(&params.application_id, &params.id, &user.id)
        .await?;

    Ok(Json(AcceptResponse {
        project: acceptance.project.into(),
        application: acceptance.application,
        rejected_count: acceptance.rejected,
    }))
}
