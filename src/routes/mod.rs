//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/auth` - Registration, login and the current user
//! - `/api/projects` - Project CRUD and team membership
//! - `/api/research` - Deep research jobs
//! - `/api/health` - Health checks
//! - `/` - Service banner

pub mod auth;
pub mod health;
pub mod projects;
pub mod research;

use axum::{routing::get, Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let allowed_origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .route("/", get(root))
        .merge(auth::router(state.clone()))
        .merge(projects::router(state.clone()))
        .merge(research::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &allowed_origins)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Consultant Research API is running" }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::response::Response;
    use futures::future::BoxFuture;
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use uuid::Uuid;

    use crate::config::{AuthConfig, Config, DatabaseConfig, ResearchConfig, ServerConfig};
    use crate::middleware::issue_token;
    use crate::models::{AppState, User};
    use crate::research::{
        DeepResearchService, HttpResearchClient, InMemoryResearchStore, PgResearchStore,
        ResearchStore, TaskSpawner, TemplateEnhancer,
    };

    /// Drops every task, leaving jobs pending.
    struct IdleSpawner;

    impl TaskSpawner for IdleSpawner {
        fn spawn_detached(&self, _task: BoxFuture<'static, ()>) {}
    }

    pub fn test_config() -> Config {
        Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            database: DatabaseConfig {
                url: "postgres://postgres@localhost:5432/consultant_research_test".to_string(),
                max_connections: 1,
                min_connections: 0,
            },
            auth: AuthConfig {
                jwt_secret: "route-test-secret".to_string(),
                jwt_expiration_days: 1,
            },
            research: ResearchConfig {
                api_url: "http://127.0.0.1:9".to_string(),
                reconcile_on_startup: false,
            },
        }
    }

    fn idle_service(store: Arc<dyn ResearchStore>, config: &Config) -> DeepResearchService {
        DeepResearchService::new(
            store,
            Arc::new(HttpResearchClient::new(config.research.api_url.clone())),
            Arc::new(TemplateEnhancer),
            Arc::new(IdleSpawner),
        )
    }

    /// State with a never-connected pool and an in-memory research store.
    pub fn test_state() -> (AppState, InMemoryResearchStore) {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database.url)
            .unwrap();
        let store = InMemoryResearchStore::new();
        let research = idle_service(Arc::new(store.clone()), &config);

        (AppState { pool, config, research }, store)
    }

    /// State over a live database, research jobs stored in PostgreSQL.
    pub fn database_state(pool: PgPool) -> AppState {
        let config = test_config();
        let research = idle_service(Arc::new(PgResearchStore::new(pool.clone())), &config);
        AppState { pool, config, research }
    }

    pub fn token_for(state: &AppState, user: &User) -> String {
        issue_token(user, &state.config.auth).unwrap()
    }

    /// Token for a user that exists only in the token.
    pub fn bearer(state: &AppState) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: "tester@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            company: "Example LLP".to_string(),
            role: "consultant".to_string(),
            created_at: chrono::Utc::now(),
        };
        token_for(state, &user)
    }

    pub async fn read_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
