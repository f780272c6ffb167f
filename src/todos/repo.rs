use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    db::timed,
    error::AppError,
    todos::repo_types::{Todo, TodoChanges, TodoCounts, TodoScope, TodoWithOwner},
};

/// Persistence seam for todo records. Lookups by id honor `scope`: a todo
/// outside it behaves as if it did not exist.
#[async_trait]
pub trait TodoRepo: Send + Sync {
    /// Newest first.
    async fn list(&self, scope: TodoScope) -> Result<Vec<Todo>, AppError>;
    async fn list_with_owners(&self) -> Result<Vec<TodoWithOwner>, AppError>;
    async fn insert(&self, title: &str, owner: Option<i64>) -> Result<Todo, AppError>;
    async fn update(
        &self,
        id: i64,
        scope: TodoScope,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, AppError>;
    async fn delete(&self, id: i64, scope: TodoScope) -> Result<bool, AppError>;
    async fn counts(&self) -> Result<TodoCounts, AppError>;
}

#[derive(Clone)]
pub struct PgTodoRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgTodoRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl TodoRepo for PgTodoRepo {
    async fn list(&self, scope: TodoScope) -> Result<Vec<Todo>, AppError> {
        timed(self.timeout, async {
            let rows = sqlx::query_as::<_, Todo>(
                r#"
                SELECT id, title, completed, user_id, created_at
                FROM todos
                WHERE ($1::BIGINT IS NULL OR user_id = $1)
                ORDER BY id DESC
                "#,
            )
            .bind(scope.owner())
            .fetch_all(&self.db)
            .await?;
            Ok::<_, AppError>(rows)
        })
        .await
    }

    async fn list_with_owners(&self) -> Result<Vec<TodoWithOwner>, AppError> {
        timed(self.timeout, async {
            let rows = sqlx::query_as::<_, TodoWithOwner>(
                r#"
                SELECT t.id, t.title, t.completed, t.user_id, t.created_at,
                       u.username AS owner_username
                  FROM todos t
                  LEFT JOIN users u ON t.user_id = u.id
                 ORDER BY t.id DESC
                "#,
            )
            .fetch_all(&self.db)
            .await?;
            Ok::<_, AppError>(rows)
        })
        .await
    }

    async fn insert(&self, title: &str, owner: Option<i64>) -> Result<Todo, AppError> {
        timed(self.timeout, async {
            let todo = sqlx::query_as::<_, Todo>(
                r#"
                INSERT INTO todos (title, completed, user_id)
                VALUES ($1, FALSE, $2)
                RETURNING id, title, completed, user_id, created_at
                "#,
            )
            .bind(title)
            .bind(owner)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, AppError>(todo)
        })
        .await
    }

    async fn update(
        &self,
        id: i64,
        scope: TodoScope,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, AppError> {
        timed(self.timeout, async {
            let todo = sqlx::query_as::<_, Todo>(
                r#"
                UPDATE todos
                   SET title     = COALESCE($3, title),
                       completed = COALESCE($4, completed)
                 WHERE id = $1
                   AND ($2::BIGINT IS NULL OR user_id = $2)
                RETURNING id, title, completed, user_id, created_at
                "#,
            )
            .bind(id)
            .bind(scope.owner())
            .bind(changes.title.as_deref())
            .bind(changes.completed)
            .fetch_optional(&self.db)
            .await?;
            Ok::<_, AppError>(todo)
        })
        .await
    }

    async fn delete(&self, id: i64, scope: TodoScope) -> Result<bool, AppError> {
        timed(self.timeout, async {
            let result = sqlx::query(
                r#"
                DELETE FROM todos
                 WHERE id = $1
                   AND ($2::BIGINT IS NULL OR user_id = $2)
                "#,
            )
            .bind(id)
            .bind(scope.owner())
            .execute(&self.db)
            .await?;
            Ok::<_, AppError>(result.rows_affected() > 0)
        })
        .await
    }

    async fn counts(&self) -> Result<TodoCounts, AppError> {
        timed(self.timeout, async {
            let counts = sqlx::query_as::<_, TodoCounts>(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE completed) AS completed
                  FROM todos
                "#,
            )
            .fetch_one(&self.db)
            .await?;
            Ok::<_, AppError>(counts)
        })
        .await
    }
}
