use tracing::info;

use crate::{
    admin::dto::{CreateUserRequest, Stats, TodoStats, UpdateUserRequest, UserStats},
    auth::{
        extractors::CurrentUser,
        repo::UserRepo,
        repo_types::{Role, User},
        services::{self as credentials, parse_role, NewUserInput, UserPatch},
    },
    error::AppError,
    todos::repo::TodoRepo,
};

/// The caller may not strip their own admin role.
fn guard_self_demotion(caller: &CurrentUser, target: i64, role: Role) -> Result<(), AppError> {
    if target == caller.id && role == Role::User {
        return Err(AppError::SelfDemotion);
    }
    Ok(())
}

pub async fn get_stats(users: &dyn UserRepo, todos: &dyn TodoRepo) -> Result<Stats, AppError> {
    let by_role = users.count_by_role().await?;
    let counts = todos.counts().await?;
    Ok(Stats {
        users: UserStats {
            total: by_role.iter().map(|rc| rc.count).sum(),
            by_role,
        },
        todos: TodoStats {
            total: counts.total,
            completed: counts.completed,
            pending: counts.total - counts.completed,
        },
    })
}

pub async fn set_user_role(
    users: &dyn UserRepo,
    caller: &CurrentUser,
    target: i64,
    role: Option<&str>,
) -> Result<User, AppError> {
    let role = parse_role(role.unwrap_or_default())?;
    guard_self_demotion(caller, target, role)?;
    let user = credentials::update_user(
        users,
        target,
        UserPatch {
            role: Some(role),
            ..UserPatch::default()
        },
    )
    .await?;
    info!(admin_id = caller.id, user_id = target, %role, "role changed");
    Ok(user)
}

pub async fn delete_user(
    users: &dyn UserRepo,
    caller: &CurrentUser,
    target: i64,
) -> Result<(), AppError> {
    if target == caller.id {
        return Err(AppError::SelfDeletion);
    }
    credentials::delete_user(users, target).await?;
    info!(admin_id = caller.id, user_id = target, "user removed by admin");
    Ok(())
}

pub async fn create_user(
    users: &dyn UserRepo,
    caller: &CurrentUser,
    req: CreateUserRequest,
) -> Result<User, AppError> {
    let role = match req.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::User,
    };
    let user = credentials::create_user(
        users,
        NewUserInput {
            username: req.username,
            email: req.email,
            password: req.password,
            role,
        },
    )
    .await?;
    info!(admin_id = caller.id, user_id = user.id, "user created by admin");
    Ok(user)
}

pub async fn update_user(
    users: &dyn UserRepo,
    caller: &CurrentUser,
    target: i64,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let role = req.role.as_deref().map(parse_role).transpose()?;
    if let Some(role) = role {
        guard_self_demotion(caller, target, role)?;
    }
    credentials::update_user(
        users,
        target,
        UserPatch {
            username: req.username,
            email: req.email,
            password: req.password,
            role,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MemoryStore,
        todos::{repo_types::TodoScope, services as todo_services},
    };

    async fn user(store: &MemoryStore, name: &str, role: Role) -> CurrentUser {
        let u = credentials::create_user(
            store,
            NewUserInput {
                username: Some(name.into()),
                email: Some(format!("{name}@x.com")),
                password: Some("secret1".into()),
                role,
            },
        )
        .await
        .unwrap();
        CurrentUser {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }

    #[tokio::test]
    async fn sole_admin_cannot_self_demote() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;

        let err = set_user_role(&store, &admin, admin.id, Some("user"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SelfDemotion));

        let err = update_user(
            &store,
            &admin,
            admin.id,
            UpdateUserRequest {
                role: Some("user".into()),
                ..UpdateUserRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::SelfDemotion));

        // Re-affirming one's own admin role is allowed.
        let same = set_user_role(&store, &admin, admin.id, Some("admin"))
            .await
            .unwrap();
        assert_eq!(same.role, Role::Admin);
    }

    #[tokio::test]
    async fn admin_can_demote_other_admins() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;
        let other = user(&store, "ops", Role::Admin).await;
        let demoted = set_user_role(&store, &admin, other.id, Some("user"))
            .await
            .unwrap();
        assert_eq!(demoted.role, Role::User);
    }

    #[tokio::test]
    async fn role_must_be_known() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;
        let bob = user(&store, "bob", Role::User).await;
        for role in [None, Some("superuser"), Some("ADMIN")] {
            let err = set_user_role(&store, &admin, bob.id, role).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        let err = create_user(
            &store,
            &admin,
            CreateUserRequest {
                username: Some("carl".into()),
                email: Some("carl@x.com".into()),
                password: Some("secret1".into()),
                role: Some("owner".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn set_role_on_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;
        let err = set_user_role(&store, &admin, 999, Some("admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn self_deletion_is_refused() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;
        let err = delete_user(&store, &admin, admin.id).await.unwrap_err();
        assert!(matches!(err, AppError::SelfDeletion));
        let err = delete_user(&store, &admin, 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_user_honors_requested_role() {
        let store = MemoryStore::new();
        let admin = user(&store, "root", Role::Admin).await;
        let created = create_user(
            &store,
            &admin,
            CreateUserRequest {
                username: Some("dana".into()),
                email: Some("Dana@X.com".into()),
                password: Some("secret1".into()),
                role: Some("admin".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.role, Role::Admin);
        assert_eq!(created.email, "dana@x.com");
    }

    #[tokio::test]
    async fn stats_are_consistent() {
        let store = MemoryStore::new();
        let empty = get_stats(&store, &store).await.unwrap();
        assert_eq!(empty.users.total, 0);
        assert!(empty.users.by_role.is_empty());
        assert_eq!(empty.todos.pending, 0);

        let admin = user(&store, "root", Role::Admin).await;
        user(&store, "bob", Role::User).await;
        user(&store, "cat", Role::User).await;
        for title in ["a", "b", "c"] {
            todo_services::create_todo(&store, Some(title), Some(admin.id))
                .await
                .unwrap();
        }
        todo_services::update_todo(&store, 1, TodoScope::All, None, Some(true))
            .await
            .unwrap();

        let stats = get_stats(&store, &store).await.unwrap();
        assert_eq!(stats.users.total, 3);
        assert_eq!(
            stats.users.by_role.iter().map(|rc| rc.count).sum::<i64>(),
            stats.users.total
        );
        assert_eq!(stats.todos.total, 3);
        assert_eq!(stats.todos.completed, 1);
        assert_eq!(stats.todos.pending, stats.todos.total - stats.todos.completed);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["users"]["byRole"][0]["role"], "admin");
        assert_eq!(json["todos"]["pending"], 2);
    }
}
