use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
