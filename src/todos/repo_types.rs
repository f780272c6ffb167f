use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Todo record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub user_id: Option<i64>, // NULL once the owner is deleted
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Todo joined with its owner's username; `owner_username` is `None` when
/// the todo has no resolvable owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TodoWithOwner {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub todo: Todo,
    pub owner_username: Option<String>,
}

/// Which todos a caller may see and touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoScope {
    All,
    Owner(i64),
}

impl TodoScope {
    pub fn owner(self) -> Option<i64> {
        match self {
            TodoScope::All => None,
            TodoScope::Owner(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct TodoCounts {
    pub total: i64,
    pub completed: i64,
}
