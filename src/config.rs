use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEV_JWT_SECRET: &str = "your-super-secret-jwt-key-change-this-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to
    /// local-development defaults.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                or("DB_USER", "postgres"),
                or("DB_PASS", "postgres"),
                or("DB_HOST", "localhost"),
                or("DB_PORT", "5432"),
                or("DB_NAME", "todolist"),
            ),
        };

        let database = DatabaseConfig {
            url: database_url,
            max_connections: parse(&var, "DB_MAX_CONNECTIONS", 5)?,
            query_timeout_secs: parse(&var, "DB_QUERY_TIMEOUT_SECS", 8)?,
        };

        let jwt = JwtConfig {
            secret: or("JWT_SECRET", DEV_JWT_SECRET),
            issuer: or("JWT_ISSUER", "todolist"),
            audience: or("JWT_AUDIENCE", "todolist-users"),
            ttl_minutes: parse(&var, "JWT_TTL_MINUTES", 60 * 24 * 7)?,
        };

        let port = match var("APP_PORT").or_else(|| var("PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid APP_PORT/PORT value {raw:?}"))?,
            None => 5000,
        };

        let cors_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database,
            jwt,
            host: or("APP_HOST", "0.0.0.0"),
            port,
            cors_origins,
        })
    }
}

fn parse<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid {key} value {raw:?}")),
        None => Ok(default),
    }
}
