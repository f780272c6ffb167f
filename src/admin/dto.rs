use serde::{Deserialize, Serialize};

use crate::auth::repo_types::RoleCount;

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetRoleRequest {
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: i64,
    #[serde(rename = "byRole")]
    pub by_role: Vec<RoleCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub users: UserStats,
    pub todos: TodoStats,
}
