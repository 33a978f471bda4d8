//! User accounts and bearer sessions

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::api::auth::{generate_salt, hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::db::models::User;
use crate::ids::{generate_session_token, new_id};
use crate::{Error, Result};

#[derive(FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
    password_salt: String,
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    if !email.contains('@') || email.trim() != email {
        return Err(Error::InvalidInput(format!("invalid email: {}", email)));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Register a new user. Duplicate username or email is a [`Error::Conflict`].
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    validate_registration(username, email, password)?;

    let user = User {
        id: new_id(),
        username: username.trim().to_string(),
        email: email.to_lowercase(),
        created_at: now,
        updated_at: now,
    };
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, password_salt, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&hash)
    .bind(&salt)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| Error::from_unique_violation(e, "user with this username or email"))?;

    debug!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Check credentials; any mismatch is reported as the same [`Error::Unauthorized`]
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> Result<User> {
    let row: Option<CredentialRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, created_at, updated_at, password_hash, password_salt
        FROM users WHERE email = ?
        "#,
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) if verify_password(password, &row.password_salt, &row.password_hash) => {
            Ok(row.user)
        }
        _ => Err(Error::Unauthorized("invalid email or password".to_string())),
    }
}

pub async fn find_user(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Issue a new bearer token for `user_id`
pub async fn create_session(pool: &SqlitePool, user_id: &str, now: DateTime<Utc>) -> Result<String> {
    let token = generate_session_token();

    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a bearer token to its user
pub async fn find_user_by_session(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.email, u.created_at, u.updated_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Revoke a bearer token. Returns false when the token was unknown.
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
