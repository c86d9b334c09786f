use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    CreateProjectRequest, Project, ProjectSummary, UpdateProjectRequest, User, UserSummary,
};
use crate::types::{AppError, AppResult};

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
}

pub struct DatabaseOperations;

impl DatabaseOperations {
    // User operations
    pub async fn create_user(pool: &PgPool, user: &NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, company, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.company)
        .bind(&user.role)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::InvalidRequest("User already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(created)
    }

    pub async fn get_user_by_email(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Summaries of the given users keyed by id; unknown ids are absent.
    pub async fn get_user_summaries(
        pool: &PgPool,
        user_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, UserSummary>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, first_name, last_name, email FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(pool)
        .await?;

        Ok(users.into_iter().map(|user| (user.id, user)).collect())
    }

    // Project operations
    pub async fn create_project(
        pool: &PgPool,
        owner_id: Uuid,
        request: &CreateProjectRequest,
    ) -> AppResult<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, description, client, owner_id, team)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.client)
        .bind(owner_id)
        .bind(request.team.clone().unwrap_or_default())
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    pub async fn get_project(pool: &PgPool, project_id: Uuid) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(pool)
            .await?;

        Ok(project)
    }

    pub async fn get_project_summary(
        pool: &PgPool,
        project_id: Uuid,
    ) -> AppResult<Option<ProjectSummary>> {
        let project = sqlx::query_as::<_, ProjectSummary>(
            "SELECT id, name, client FROM projects WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Projects the user owns or is on the team of, most recently updated first.
    pub async fn list_projects_for_user(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE owner_id = $1 OR $1 = ANY(team)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Empty strings leave the stored value unchanged.
    pub async fn update_project(
        pool: &PgPool,
        project_id: Uuid,
        request: &UpdateProjectRequest,
    ) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE(NULLIF($2, ''), name),
                description = COALESCE(NULLIF($3, ''), description),
                client = COALESCE(NULLIF($4, ''), client),
                status = COALESCE(NULLIF($5, ''), status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.client)
        .bind(&request.status)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn add_team_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET team = CASE WHEN $2 = ANY(team) THEN team ELSE array_append(team, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn remove_team_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET team = array_remove(team, $2), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn delete_project(pool: &PgPool, project_id: Uuid) -> AppResult<bool> {
        let outcome = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(outcome.rows_affected() > 0)
    }
}
