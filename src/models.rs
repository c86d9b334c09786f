use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::config::Config;
use crate::research::{DeepResearchService, ResearchTemplate};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub research: DeepResearchService,
}

// Persisted records
// Note: FromRow is used with runtime query_as (no DATABASE_URL needed at compile time)

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub client: String,
    pub owner_id: Uuid,
    pub team: Vec<Uuid>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Project {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

/// Lifecycle state of a research job.
///
/// Moves only forward: `Pending -> InProgress -> {Completed, Failed}`.
/// `Pending -> Failed` is allowed for jobs that never got started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ResearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchStatus::Pending => "pending",
            ResearchStatus::InProgress => "in_progress",
            ResearchStatus::Completed => "completed",
            ResearchStatus::Failed => "failed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(ResearchStatus::Pending),
            "in_progress" => Some(ResearchStatus::InProgress),
            "completed" => Some(ResearchStatus::Completed),
            "failed" => Some(ResearchStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchStatus::Completed | ResearchStatus::Failed)
    }

    /// States a job may be in immediately before entering `self`.
    pub fn predecessors(&self) -> &'static [ResearchStatus] {
        match self {
            ResearchStatus::Pending => &[],
            ResearchStatus::InProgress => &[ResearchStatus::Pending],
            ResearchStatus::Completed => &[ResearchStatus::InProgress],
            ResearchStatus::Failed => &[ResearchStatus::Pending, ResearchStatus::InProgress],
        }
    }

    pub fn can_transition_to(&self, next: ResearchStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a completed research job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub answer: String,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchJob {
    pub id: Uuid,
    pub title: String,
    pub query: String,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub depth: i32,
    pub breadth: i32,
    pub template: ResearchTemplate,
    pub client_context: Option<String>,
    pub industry_focus: Option<String>,
    pub result: Option<ResearchResult>,
    pub status: ResearchStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// Referenced records as embedded in responses

/// Public fields of a user referenced by another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub client: String,
}

/// A research job with its creator resolved and, on single lookups, its project.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchJobDetails {
    #[serde(flatten)]
    pub job: ResearchJob,
    pub creator: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
}

/// A project with its owner and team resolved to users. Team members
/// without a user record are left out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub client: String,
    pub owner: Option<UserSummary>,
    pub team: Vec<UserSummary>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProjectDetails {
    pub fn new(project: Project, users: &HashMap<Uuid, UserSummary>) -> Self {
        Self {
            owner: users.get(&project.owner_id).cloned(),
            team: project
                .team
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect(),
            id: project.id,
            name: project.name,
            description: project.description,
            client: project.client,
            status: project.status,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// A job as handed to the store, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewResearchJob {
    pub title: String,
    pub query: String,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub depth: i32,
    pub breadth: i32,
    pub template: ResearchTemplate,
    pub client_context: Option<String>,
    pub industry_focus: Option<String>,
}

// API Request/Response types

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "Project name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Client name is required"))]
    pub client: String,
    pub description: Option<String>,
    pub team: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    #[validate(custom(function = "validate_project_status"))]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResearchRequest {
    #[validate(length(min = 1, message = "Research query is required"))]
    pub query: String,
    pub project_id: Uuid,
    #[validate(custom(function = "validate_template"))]
    pub template: String,
    #[validate(range(min = 1, max = 5, message = "Depth must be between 1 and 5"))]
    pub depth: Option<i32>,
    #[validate(range(min = 2, max = 10, message = "Breadth must be between 2 and 10"))]
    pub breadth: Option<i32>,
    pub client_context: Option<String>,
    pub industry_focus: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResearchResponse {
    pub message: String,
    pub research_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

fn validate_template(template: &str) -> Result<(), ValidationError> {
    if ResearchTemplate::from_name(template).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("template").with_message("Invalid template".into()))
    }
}

fn validate_project_status(status: &str) -> Result<(), ValidationError> {
    if ProjectStatus::from_name(status).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("status").with_message("Invalid project status".into()))
    }
}
