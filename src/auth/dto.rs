use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::{
    extractors::CurrentUser,
    repo_types::{Role, User},
};

/// Request body for user registration. Fields are optional so that a
/// missing one is reported as a validation error instead of a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

impl From<CurrentUser> for PublicUser {
    fn from(u: CurrentUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageWithUser {
    pub message: String,
    pub user: PublicUser,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}
