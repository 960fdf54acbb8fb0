//! Integration tests for the user repository using in-memory
//! SurrealDB.

use stockroom_core::error::StockroomError;
use stockroom_core::models::user::{CreateUser, UpdateUser, UserRole};
use stockroom_core::repository::UserRepository;
use stockroom_db::repository::SurrealUserRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> SurrealUserRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockroom_db::run_migrations(&db).await.unwrap();
    SurrealUserRepository::new(db)
}

fn create_input(name: &str, email: &str, role: UserRole) -> CreateUser {
    CreateUser {
        name: name.into(),
        email: email.into(),
        password: "correct-horse-battery".into(),
        role,
        ad_account: None,
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = setup().await;

    let user = repo
        .create(create_input("Alice", "Alice@Example.COM", UserRole::Viewer))
        .await
        .unwrap();

    // Email is normalized to lowercase.
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role, UserRole::Viewer);

    // Password should be hashed, not stored in plaintext.
    assert_ne!(user.password_hash, "correct-horse-battery");
    assert!(user.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.name, "Alice");
}

#[tokio::test]
async fn duplicate_email_rejected() {
    let repo = setup().await;

    repo.create(create_input("A", "same@example.com", UserRole::Viewer))
        .await
        .unwrap();

    let result = repo
        .create(create_input("B", "SAME@example.com", UserRole::Viewer))
        .await;
    assert!(
        matches!(result, Err(StockroomError::Conflict { .. })),
        "duplicate email should be a conflict"
    );
}

#[tokio::test]
async fn get_by_email_is_case_insensitive() {
    let repo = setup().await;
    let user = repo
        .create(create_input("Eve", "eve@example.com", UserRole::Manager))
        .await
        .unwrap();

    let fetched = repo.get_by_email("EVE@example.com").await.unwrap().unwrap();
    assert_eq!(fetched.id, user.id);
    assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn update_role_account_and_password() {
    let repo = setup().await;
    let user = repo
        .create(create_input("Frank", "frank@example.com", UserRole::Viewer))
        .await
        .unwrap();

    let updated = repo
        .update(
            user.id,
            UpdateUser {
                role: Some(UserRole::Manager),
                ad_account: Some(Some("fmartinez".into())),
                password: Some("new-password-123".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, UserRole::Manager);
    assert_eq!(updated.ad_account.as_deref(), Some("fmartinez"));
    assert_ne!(updated.password_hash, user.password_hash);
    assert_eq!(updated.email, "frank@example.com"); // unchanged

    // Some(None) clears the directory account.
    let cleared = repo
        .update(
            user.id,
            UpdateUser {
                ad_account: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.ad_account.is_none());
}

#[tokio::test]
async fn delete_removes_account() {
    let repo = setup().await;
    let user = repo
        .create(create_input("Gone", "gone@example.com", UserRole::Viewer))
        .await
        .unwrap();

    repo.delete(user.id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(user.id).await,
        Err(StockroomError::NotFound { .. })
    ));
}

#[tokio::test]
async fn counts_by_role() {
    let repo = setup().await;
    repo.create(create_input("A", "a@example.com", UserRole::Admin))
        .await
        .unwrap();
    repo.create(create_input("B", "b@example.com", UserRole::Admin))
        .await
        .unwrap();
    repo.create(create_input("C", "c@example.com", UserRole::Viewer))
        .await
        .unwrap();

    assert_eq!(repo.count().await.unwrap(), 3);
    assert_eq!(repo.count_by_role(UserRole::Admin).await.unwrap(), 2);
    assert_eq!(repo.count_by_role(UserRole::Manager).await.unwrap(), 0);
}

#[tokio::test]
async fn list_is_newest_first() {
    let repo = setup().await;
    for i in 0..3 {
        repo.create(create_input(
            &format!("User {i}"),
            &format!("user-{i}@example.com"),
            UserRole::Viewer,
        ))
        .await
        .unwrap();
    }

    let listed = repo.list().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].name, "User 2");
}
