//! Auth API Routes
//!
//! - POST /api/auth/register - Create an account, returns user and token
//! - POST /api/auth/login - Exchange credentials for a token
//! - GET /api/auth/me - Claims of the authenticated caller

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, warn};
use validator::Validate;

use crate::db::{DatabaseOperations, NewUser};
use crate::middleware::{issue_token, AuthUser};
use crate::models::{AppState, AuthResponse, LoginRequest, RegisterRequest};
use crate::types::{AppError, AppJson, AppResult};
use crate::utils::{hash_password, verify_password};

const DEFAULT_ROLE: &str = "consultant";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(current_user))
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;

    let password_hash = hash_password(&request.password).await?;
    let user = DatabaseOperations::create_user(
        &state.pool,
        &NewUser {
            email: request.email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            company: request.company,
            role: request
                .role
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        },
    )
    .await?;

    info!(user_id = %user.id, "User registered");
    let token = issue_token(&user, &state.config.auth)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    request.validate()?;

    let invalid = || AppError::Auth("Invalid credentials".to_string());

    let user = DatabaseOperations::get_user_by_email(&state.pool, &request.email)
        .await?
        .ok_or_else(invalid)?;

    match verify_password(&request.password, &user.password_hash).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(invalid());
        }
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Stored password hash could not be checked");
            return Err(invalid());
        }
    }

    let token = issue_token(&user, &state.config.auth)?;
    Ok(Json(AuthResponse { user, token }))
}

async fn current_user(user: AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user": user.0 }))
}
