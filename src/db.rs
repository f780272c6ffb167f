use std::{future::Future, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{config::DatabaseConfig, error::AppError};

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.query_timeout())
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    info!(max_connections = cfg.max_connections, "database pool ready");
    Ok(db)
}

/// Applies the bootstrap schema. Every statement is idempotent.
pub async fn ensure_schema(db: &PgPool) -> anyhow::Result<()> {
    for (index, statement) in split_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(db)
            .await
            .with_context(|| format!("schema statement {}", index + 1))?;
    }
    Ok(())
}

fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Runs one storage call under `limit`, mapping an elapsed deadline to
/// [`AppError::Timeout`].
pub async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::Timeout)?
}
