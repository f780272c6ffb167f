use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::{
    auth::{jwt::JwtKeys, repo_types::Role},
    error::{AppError, AuthError},
    state::AppState,
    todos::repo_types::TodoScope,
};

/// Identity attached to a request once the gate accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins reach every todo; everyone else only their own.
    pub fn todo_scope(&self) -> TodoScope {
        if self.is_admin() {
            TodoScope::All
        } else {
            TodoScope::Owner(self.id)
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Validates the bearer token, then re-reads the user so that deleted
/// accounts and changed roles take effect immediately.
pub struct AuthUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::from(e)
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.sub, "token for missing user");
                AppError::Auth(AuthError::UserNotFound)
            })?;

        Ok(AuthUser(CurrentUser {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }))
    }
}

/// [`AuthUser`] that additionally holds the admin role.
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = user.id, "admin route refused");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
