use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    app::AppJson,
    auth::{
        dto::{LoginRequest, LoginResponse, MessageWithUser, RegisterRequest, UserEnvelope},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::Role,
        services::{authenticate, create_user, NewUserInput},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageWithUser>), AppError> {
    let user = create_user(
        state.users.as_ref(),
        NewUserInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: Role::User,
        },
    )
    .await?;

    info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageWithUser {
            message: "User registered successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = authenticate(
        state.users.as_ref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;

    let token = JwtKeys::from_ref(&state).issue(user.id, &user.username, user.role)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn verify(AuthUser(user): AuthUser) -> Json<UserEnvelope> {
    Json(UserEnvelope { user: user.into() })
}
