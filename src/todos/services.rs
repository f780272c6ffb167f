use tracing::info;

use crate::{
    error::AppError,
    todos::{
        repo::TodoRepo,
        repo_types::{Todo, TodoChanges, TodoScope},
    },
};

fn clean_title(raw: &str) -> Option<String> {
    let title = raw.trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub async fn list_todos(todos: &dyn TodoRepo, scope: TodoScope) -> Result<Vec<Todo>, AppError> {
    todos.list(scope).await
}

pub async fn create_todo(
    todos: &dyn TodoRepo,
    title: Option<&str>,
    owner: Option<i64>,
) -> Result<Todo, AppError> {
    let title = title
        .and_then(clean_title)
        .ok_or_else(|| AppError::validation("Title is required"))?;
    let todo = todos.insert(&title, owner).await?;
    info!(todo_id = todo.id, owner = ?owner, "todo created");
    Ok(todo)
}

pub async fn update_todo(
    todos: &dyn TodoRepo,
    id: i64,
    scope: TodoScope,
    title: Option<&str>,
    completed: Option<bool>,
) -> Result<Todo, AppError> {
    let title = match title {
        Some(raw) => Some(
            clean_title(raw).ok_or_else(|| AppError::validation("Title cannot be empty"))?,
        ),
        None => None,
    };
    if title.is_none() && completed.is_none() {
        return Err(AppError::validation("No fields to update"));
    }

    todos
        .update(id, scope, TodoChanges { title, completed })
        .await?
        .ok_or(AppError::NotFound("Todo"))
}

pub async fn delete_todo(todos: &dyn TodoRepo, id: i64, scope: TodoScope) -> Result<(), AppError> {
    if !todos.delete(id, scope).await? {
        return Err(AppError::NotFound("Todo"));
    }
    info!(todo_id = id, "todo deleted");
    Ok(())
}
