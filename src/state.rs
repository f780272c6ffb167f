use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserRepo, UserRepo},
    },
    config::AppConfig,
    db,
    todos::repo::{PgTodoRepo, TodoRepo},
};

/// Built once at startup and cloned into every request; all fields are
/// shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub todos: Arc<dyn TodoRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let db = db::connect(&config.database).await?;
        Ok(Self::from_parts(db, Arc::new(config)))
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        if config.jwt.uses_dev_secret() {
            warn!("JWT_SECRET is not set; using the insecure development secret");
        }
        let timeout = config.database.query_timeout();
        Self {
            keys: JwtKeys::from(&config.jwt),
            users: Arc::new(PgUserRepo::new(db.clone(), timeout)),
            todos: Arc::new(PgTodoRepo::new(db.clone(), timeout)),
            db,
            config,
        }
    }

    /// State backed by an in-memory store; the pool never connects.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::memory::MemoryStore;

        let config = Arc::new(
            AppConfig::from_vars(|key| match key {
                "JWT_SECRET" => Some("test-secret".into()),
                _ => None,
            })
            .expect("test config"),
        );
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool ok");
        let store = Arc::new(MemoryStore::new());

        Self {
            db,
            keys: JwtKeys::from(&config.jwt),
            config,
            users: store.clone(),
            todos: store,
        }
    }
}
