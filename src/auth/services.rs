//! Credential store operations: validation, hashing and persistence of users.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo::UserRepo,
        repo_types::{NewUser, Role, User, UserChanges},
    },
    error::{AppError, AuthError},
};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::validation(
            "Username must be at least 3 characters long",
        ));
    }
    Ok(username.to_string())
}

pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email format"));
    }
    Ok(email)
}

pub(crate) fn check_password(plain: &str) -> Result<(), AppError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse::<Role>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Unvalidated input for [`create_user`].
#[derive(Debug, Clone, Default)]
pub struct NewUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Role,
}

/// Unvalidated partial update for [`update_user`].
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub async fn create_user(users: &dyn UserRepo, input: NewUserInput) -> Result<User, AppError> {
    let (Some(username), Some(email), Some(password)) =
        (input.username, input.email, input.password)
    else {
        return Err(AppError::validation(
            "Username, email, and password are required",
        ));
    };

    let username = normalize_username(&username)?;
    check_password(&password)?;
    let email = normalize_email(&email)?;
    let password_hash = hash_password(&password)?;

    let user = users
        .insert(NewUser {
            username,
            email,
            password_hash,
            role: input.role,
        })
        .await
        .map_err(|e| {
            if let AppError::Conflict(reason) = &e {
                warn!(%reason, "user creation rejected");
            }
            e
        })?;

    info!(user_id = user.id, username = %user.username, role = %user.role, "user created");
    Ok(user)
}

pub async fn update_user(
    users: &dyn UserRepo,
    id: i64,
    patch: UserPatch,
) -> Result<User, AppError> {
    let mut changes = UserChanges {
        role: patch.role,
        ..UserChanges::default()
    };
    if let Some(username) = patch.username.as_deref() {
        changes.username = Some(normalize_username(username)?);
    }
    if let Some(email) = patch.email.as_deref() {
        changes.email = Some(normalize_email(email)?);
    }
    if let Some(password) = patch.password.as_deref() {
        check_password(password)?;
        changes.password_hash = Some(hash_password(password)?);
    }
    if changes.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }

    let user = users
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(users: &dyn UserRepo, id: i64) -> Result<(), AppError> {
    if !users.delete(id).await? {
        return Err(AppError::NotFound("User"));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}

pub async fn find_by_email(users: &dyn UserRepo, email: &str) -> Result<Option<User>, AppError> {
    users.find_by_email(&email.trim().to_lowercase()).await
}

pub async fn list_users(users: &dyn UserRepo) -> Result<Vec<User>, AppError> {
    users.list().await
}

/// Looks up the account and checks the password. Unknown email and wrong
/// password produce the same error.
pub async fn authenticate(
    users: &dyn UserRepo,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, AppError> {
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::validation("Email and password are required"));
    };
    let Some(user) = find_by_email(users, email).await? else {
        warn!("login unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }
    Ok(user)
}
