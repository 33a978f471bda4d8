//! Tests for database initialization on a real file

use meetly_common::config::RootFolderInitializer;
use meetly_common::db::init::{init_database, SCHEMA_VERSION};
use meetly_common::db::meetings::{create_meeting, find_meeting_by_code};
use meetly_common::db::participants::{join, leave};
use meetly_common::db::users::create_user;
use meetly_common::time::now;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp = TempDir::new().unwrap();
    let initializer = RootFolderInitializer::new(temp.path().join("root"));
    initializer.ensure_directory_exists().unwrap();
    assert!(!initializer.database_exists());

    let pool = init_database(&initializer.database_path()).await.unwrap();
    assert!(initializer.database_exists());

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_database_parent_folders_created() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("a").join("b").join("meetly.db");

    init_database(&db_path).await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("meetly.db");
    let t0 = now();

    let code = {
        let pool = init_database(&db_path).await.unwrap();
        let host = create_user(&pool, "host", "host@example.com", "password", t0)
            .await
            .unwrap();
        let meeting = create_meeting(&pool, &host.id, "Persisted", None, None, t0)
            .await
            .unwrap();
        join(&pool, &meeting, &host.id, t0).await.unwrap();
        leave(&pool, &meeting, &host.id, t0 + chrono::Duration::seconds(90))
            .await
            .unwrap();
        pool.close().await;
        meeting.code
    };

    let pool = init_database(&db_path).await.unwrap();
    let meeting = find_meeting_by_code(&pool, &code).await.unwrap().unwrap();
    assert_eq!(meeting.title, "Persisted");
    assert_eq!(meeting.duration_in_secs, 90);
    assert_eq!(meeting.start_time, Some(t0));
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let temp = TempDir::new().unwrap();
    let pool = init_database(&temp.path().join("meetly.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at) VALUES ('t', 'no-such-user', ?)",
    )
    .bind(now())
    .execute(&pool)
    .await;
    assert!(result.is_err(), "session for unknown user must be rejected");
}
