use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    admin::{
        dto::{CreateUserRequest, SetRoleRequest, Stats, UpdateUserRequest},
        services,
    },
    app::{AppJson, AppPath},
    auth::{
        dto::{MessageWithUser, PublicUser},
        extractors::AdminUser,
        services::list_users,
    },
    error::AppError,
    state::AppState,
    todos::{dto::MessageResponse, repo_types::TodoWithOwner},
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(users).post(create_user))
        .route("/admin/users/:id", put(update_user).delete(delete_user))
        .route("/admin/users/:id/role", put(set_role))
        .route("/admin/stats", get(stats))
        .route("/admin/todos", get(todos))
}

#[instrument(skip_all, fields(admin_id = admin.id))]
pub async fn users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = list_users(state.users.as_ref()).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip_all, fields(admin_id = admin.id))]
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Stats>, AppError> {
    let stats = services::get_stats(state.users.as_ref(), state.todos.as_ref()).await?;
    Ok(Json(stats))
}

#[instrument(skip_all, fields(admin_id = admin.id))]
pub async fn todos(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<TodoWithOwner>>, AppError> {
    Ok(Json(state.todos.list_with_owners().await?))
}

#[instrument(skip_all, fields(admin_id = admin.id))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageWithUser>), AppError> {
    let user = services::create_user(state.users.as_ref(), &admin, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageWithUser {
            message: "User created successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, admin, payload), fields(admin_id = admin.id))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<MessageWithUser>, AppError> {
    let user = services::update_user(state.users.as_ref(), &admin, id, payload).await?;
    Ok(Json(MessageWithUser {
        message: "User updated successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, admin, payload), fields(admin_id = admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<SetRoleRequest>,
) -> Result<Json<MessageWithUser>, AppError> {
    let user =
        services::set_user_role(state.users.as_ref(), &admin, id, payload.role.as_deref())
            .await?;
    Ok(Json(MessageWithUser {
        message: "User role updated successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, admin), fields(admin_id = admin.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_user(state.users.as_ref(), &admin, id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}
