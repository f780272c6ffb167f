use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    auth::repo_types::{NewUser, RoleCount, User, UserChanges},
    db::timed,
    error::{is_unique_violation, violated_constraint, AppError},
};

/// Persistence seam for user records. Unique constraints live in storage;
/// implementations report collisions as [`AppError::Conflict`].
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Returns `None` when no row has `id`.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, AppError>;
    /// Returns `false` when no row has `id`.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<User>, AppError>;
    async fn count_by_role(&self) -> Result<Vec<RoleCount>, AppError>;
}

pub(crate) const USERNAME_TAKEN: &str = "Username already exists";
pub(crate) const EMAIL_TAKEN: &str = "Email already exists";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgUserRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

fn map_write_error(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        let message = match violated_constraint(&err) {
            Some(name) if name.contains("username") => USERNAME_TAKEN,
            Some(name) if name.contains("email") => EMAIL_TAKEN,
            _ => "Username or email already exists",
        };
        return AppError::Conflict(message.into());
    }
    AppError::Storage(err)
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        timed(self.timeout, async {
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (username, email, password_hash, role)
                VALUES ($1, $2, $3, $4)
                RETURNING id, username, email, password_hash, role, created_at
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        timed(self.timeout, async {
            let user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, role, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
            Ok::<_, AppError>(user)
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        timed(self.timeout, async {
            let user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, role, created_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
            Ok::<_, AppError>(user)
        })
        .await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, AppError> {
        timed(self.timeout, async {
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                   SET username      = COALESCE($2, username),
                       email         = COALESCE($3, email),
                       password_hash = COALESCE($4, password_hash),
                       role          = COALESCE($5, role)
                 WHERE id = $1
                RETURNING id, username, email, password_hash, role, created_at
                "#,
            )
            .bind(id)
            .bind(changes.username.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.password_hash.as_deref())
            .bind(changes.role.map(|r| r.as_str()))
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        timed(self.timeout, async {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok::<_, AppError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        timed(self.timeout, async {
            let users = sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, role, created_at
                FROM users
                ORDER BY id DESC
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok::<_, AppError>(users)
        })
        .await
    }

    async fn count_by_role(&self) -> Result<Vec<RoleCount>, AppError> {
        timed(self.timeout, async {
            let rows = sqlx::query_as::<_, RoleCount>(
                r#"
                SELECT role, COUNT(*) AS count
                FROM users
                GROUP BY role
                ORDER BY role
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok::<_, AppError>(rows)
        })
        .await
    }
}
