use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    app::{AppJson, AppPath},
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    todos::{
        dto::{CreateTodoRequest, MessageResponse, UpdateTodoRequest},
        repo_types::Todo,
        services,
    },
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", put(update_todo).delete(delete_todo))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = services::list_todos(state.todos.as_ref(), user.todo_scope()).await?;
    Ok(Json(todos))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let todo =
        services::create_todo(state.todos.as_ref(), payload.title.as_deref(), Some(user.id))
            .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    let todo = services::update_todo(
        state.todos.as_ref(),
        id,
        user.todo_scope(),
        payload.title.as_deref(),
        payload.completed,
    )
    .await?;
    Ok(Json(todo))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_todo(state.todos.as_ref(), id, user.todo_scope()).await?;
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully".into(),
    }))
}
