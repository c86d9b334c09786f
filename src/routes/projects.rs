//! Project API Routes
//!
//! All routes require a bearer token. Mutations are restricted to the
//! project owner.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::DatabaseOperations;
use crate::middleware::AuthUser;
use crate::models::{
    AddTeamMemberRequest, AppState, CreateProjectRequest, Project, ProjectDetails,
    UpdateProjectRequest,
};
use crate::types::{AppError, AppJson, AppPath, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/projects", post(create_project).get(list_projects))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/team", post(add_team_member))
        .route("/api/projects/{id}/team/{user_id}", delete(remove_team_member))
        .with_state(state)
}

fn not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

/// Loads a project and checks the caller owns it.
async fn owned_project(state: &AppState, user: &AuthUser, id: Uuid, action: &str) -> AppResult<Project> {
    let project = DatabaseOperations::get_project(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    if !project.is_owned_by(user.id()) {
        return Err(AppError::Forbidden(format!("Not authorized to {} this project", action)));
    }
    Ok(project)
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    request.validate()?;

    let project = DatabaseOperations::create_project(&state.pool, user.id(), &request).await?;
    info!(project_id = %project.id, owner_id = %user.id(), "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_projects(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Vec<Project>>> {
    let projects = DatabaseOperations::list_projects_for_user(&state.pool, user.id()).await?;
    Ok(Json(projects))
}

async fn get_project(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ProjectDetails>> {
    let project = DatabaseOperations::get_project(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    let mut user_ids = project.team.clone();
    user_ids.push(project.owner_id);
    let users = DatabaseOperations::get_user_summaries(&state.pool, &user_ids).await?;

    Ok(Json(ProjectDetails::new(project, &users)))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateProjectRequest>,
) -> AppResult<Json<Project>> {
    request.validate()?;
    owned_project(&state, &user, id, "update").await?;

    DatabaseOperations::update_project(&state.pool, id, &request)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

async fn add_team_member(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<AddTeamMemberRequest>,
) -> AppResult<Json<Project>> {
    owned_project(&state, &user, id, "update").await?;

    DatabaseOperations::add_team_member(&state.pool, id, request.user_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

async fn remove_team_member(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath((id, member_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<Project>> {
    owned_project(&state, &user, id, "update").await?;

    DatabaseOperations::remove_team_member(&state.pool, id, member_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    owned_project(&state, &user, id, "delete").await?;

    if !DatabaseOperations::delete_project(&state.pool, id).await? {
        return Err(not_found());
    }
    info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}
