//! In-process store used by tests in place of Postgres. It mirrors the
//! schema's constraints: case-insensitive unique usernames, unique emails and
//! `ON DELETE SET NULL` for todo owners.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::{
        repo::{UserRepo, EMAIL_TAKEN, USERNAME_TAKEN},
        repo_types::{NewUser, Role, RoleCount, User, UserChanges},
    },
    error::AppError,
    todos::{
        repo::TodoRepo,
        repo_types::{Todo, TodoChanges, TodoCounts, TodoScope, TodoWithOwner},
    },
};

fn admits(scope: TodoScope, todo: &Todo) -> bool {
    match scope {
        TodoScope::All => true,
        TodoScope::Owner(id) => todo.user_id == Some(id),
    }
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    todos: Vec<Todo>,
    user_seq: i64,
    todo_seq: i64,
}

impl Tables {
    fn check_unique(&self, id: Option<i64>, username: &str, email: &str) -> Result<(), AppError> {
        for other in self.users.iter().filter(|u| Some(u.id) != id) {
            if other.username.to_lowercase() == username.to_lowercase() {
                return Err(AppError::Conflict(USERNAME_TAKEN.into()));
            }
            if other.email == email {
                return Err(AppError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().expect("memory store lock poisoned");
        f(&mut tables)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        self.with(|t| {
            t.check_unique(None, &new.username, &new.email)?;
            t.user_seq += 1;
            let user = User {
                id: t.user_seq,
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role,
                created_at: OffsetDateTime::now_utc(),
            };
            t.users.push(user.clone());
            Ok(user)
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| t.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, AppError> {
        self.with(|t| {
            let Some(current) = t.users.iter().find(|u| u.id == id).cloned() else {
                return Ok(None);
            };
            let username = changes.username.unwrap_or(current.username);
            let email = changes.email.unwrap_or(current.email);
            t.check_unique(Some(id), &username, &email)?;

            let user = t
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .expect("row located above");
            user.username = username;
            user.email = email;
            if let Some(hash) = changes.password_hash {
                user.password_hash = hash;
            }
            if let Some(role) = changes.role {
                user.role = role;
            }
            Ok(Some(user.clone()))
        })
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let before = t.users.len();
            t.users.retain(|u| u.id != id);
            if t.users.len() == before {
                return false;
            }
            for todo in t.todos.iter_mut().filter(|todo| todo.user_id == Some(id)) {
                todo.user_id = None;
            }
            true
        }))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.with(|t| t.users.iter().rev().cloned().collect()))
    }

    async fn count_by_role(&self) -> Result<Vec<RoleCount>, AppError> {
        Ok(self.with(|t| {
            [Role::Admin, Role::User]
                .into_iter()
                .map(|role| RoleCount {
                    role,
                    count: t.users.iter().filter(|u| u.role == role).count() as i64,
                })
                .filter(|rc| rc.count > 0)
                .collect()
        }))
    }
}

#[async_trait]
impl TodoRepo for MemoryStore {
    async fn list(&self, scope: TodoScope) -> Result<Vec<Todo>, AppError> {
        Ok(self.with(|t| {
            t.todos
                .iter()
                .rev()
                .filter(|todo| admits(scope, todo))
                .cloned()
                .collect()
        }))
    }

    async fn list_with_owners(&self) -> Result<Vec<TodoWithOwner>, AppError> {
        Ok(self.with(|t| {
            t.todos
                .iter()
                .rev()
                .map(|todo| TodoWithOwner {
                    owner_username: todo.user_id.and_then(|owner| {
                        t.users
                            .iter()
                            .find(|u| u.id == owner)
                            .map(|u| u.username.clone())
                    }),
                    todo: todo.clone(),
                })
                .collect()
        }))
    }

    async fn insert(&self, title: &str, owner: Option<i64>) -> Result<Todo, AppError> {
        Ok(self.with(|t| {
            t.todo_seq += 1;
            let todo = Todo {
                id: t.todo_seq,
                title: title.to_string(),
                completed: false,
                user_id: owner,
                created_at: OffsetDateTime::now_utc(),
            };
            t.todos.push(todo.clone());
            todo
        }))
    }

    async fn update(
        &self,
        id: i64,
        scope: TodoScope,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, AppError> {
        Ok(self.with(|t| {
            let todo = t
                .todos
                .iter_mut()
                .find(|todo| todo.id == id && admits(scope, todo))?;
            if let Some(title) = changes.title {
                todo.title = title;
            }
            if let Some(completed) = changes.completed {
                todo.completed = completed;
            }
            Some(todo.clone())
        }))
    }

    async fn delete(&self, id: i64, scope: TodoScope) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let before = t.todos.len();
            t.todos.retain(|todo| !(todo.id == id && admits(scope, todo)));
            t.todos.len() != before
        }))
    }

    async fn counts(&self) -> Result<TodoCounts, AppError> {
        Ok(self.with(|t| TodoCounts {
            total: t.todos.len() as i64,
            completed: t.todos.iter().filter(|todo| todo.completed).count() as i64,
        }))
    }
}
