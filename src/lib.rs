// Consultant Research - REST backend for a consulting research assistant

pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod research;   // Deep research job lifecycle
pub mod routes;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
