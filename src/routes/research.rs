//! Research API Routes
//!
//! - POST /api/research - Start a research job (202 with its id)
//! - GET /api/research/{id} - Job status and result, with creator and project
//! - GET /api/research/project/{project_id} - Jobs of a project, newest first, with creators

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::DatabaseOperations;
use crate::middleware::AuthUser;
use crate::models::{
    AppState, InitiateResearchRequest, InitiateResearchResponse, ResearchJob, ResearchJobDetails,
};
use crate::research::{InitiateResearch, ResearchTemplate};
use crate::types::{AppError, AppJson, AppPath, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/research", post(initiate_research))
        .route("/api/research/{id}", get(get_research))
        .route("/api/research/project/{project_id}", get(list_research_for_project))
        .with_state(state)
}

async fn initiate_research(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<InitiateResearchRequest>,
) -> AppResult<(StatusCode, Json<InitiateResearchResponse>)> {
    request.validate()?;
    let template = ResearchTemplate::from_name(&request.template)
        .ok_or_else(|| AppError::InvalidRequest("Invalid template".to_string()))?;

    DatabaseOperations::get_project(&state.pool, request.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    info!(user_id = %user.id(), project_id = %request.project_id, %template, "Research requested");

    let research_id = state
        .research
        .initiate(InitiateResearch {
            query: request.query,
            project_id: request.project_id,
            user_id: user.id(),
            template,
            depth: request.depth,
            breadth: request.breadth,
            client_context: request.client_context,
            industry_focus: request.industry_focus,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(InitiateResearchResponse {
            message: "Research initiated".to_string(),
            research_id,
        }),
    ))
}

/// Attaches creator summaries, one query for all jobs.
async fn with_creators(pool: &PgPool, jobs: Vec<ResearchJob>) -> AppResult<Vec<ResearchJobDetails>> {
    let mut creator_ids: Vec<Uuid> = jobs.iter().map(|job| job.creator_id).collect();
    creator_ids.sort_unstable();
    creator_ids.dedup();

    let creators = DatabaseOperations::get_user_summaries(pool, &creator_ids).await?;
    Ok(jobs
        .into_iter()
        .map(|job| ResearchJobDetails {
            creator: creators.get(&job.creator_id).cloned(),
            project: None,
            job,
        })
        .collect())
}

async fn get_research(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ResearchJobDetails>> {
    let job = state
        .research
        .get_research(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Research not found".to_string()))?;

    let mut creators = DatabaseOperations::get_user_summaries(&state.pool, &[job.creator_id]).await?;
    let project = DatabaseOperations::get_project_summary(&state.pool, job.project_id).await?;

    Ok(Json(ResearchJobDetails {
        creator: creators.remove(&job.creator_id),
        project,
        job,
    }))
}

async fn list_research_for_project(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(project_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<ResearchJobDetails>>> {
    let jobs = state.research.list_research_for_project(project_id).await?;
    Ok(Json(with_creators(&state.pool, jobs).await?))
}
