// Password hashing
//
// bcrypt is CPU-bound, so both operations run on the blocking thread pool.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::types::{AppError, AppResult};

pub async fn hash_password(password: &str) -> AppResult<String> {
    hash_password_with_cost(password, DEFAULT_COST).await
}

pub async fn hash_password_with_cost(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
}
