use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub research: ResearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    /// Base URL of the deep research engine; `/api/research` is appended.
    pub api_url: String,
    /// Fail jobs left pending/in_progress by a previous process at startup.
    pub reconcile_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "4000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
                jwt_expiration_days: env::var("JWT_EXPIRATION_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()?,
            },
            research: ResearchConfig {
                api_url: env::var("DEEP_RESEARCH_API_URL")
                    .unwrap_or_else(|_| "http://localhost:3051".to_string()),
                reconcile_on_startup: env::var("RESEARCH_RECONCILE_ON_STARTUP")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
            },
        })
    }
}
