use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_id;
use crate::error::AppResult;
use crate::types::User;

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<User> {
    Ok(User {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
    })
}

/// Inserts a user. Duplicate usernames or emails surface as `AppError::Conflict`.
pub async fn insert(pool: &SqlitePool, username: &str, email: &str, password_hash: &str) -> AppResult<User> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)")
        .bind(id.to_string())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(User { id, username: username.to_string(), email: email.to_string() })
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<User>> {
    let row = sqlx::query("SELECT id, username, email FROM users WHERE id = ?1")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_credentials(pool: &SqlitePool, username: &str) -> AppResult<Option<Credentials>> {
    let row = sqlx::query("SELECT id, username, email, password_hash FROM users WHERE username = ?1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(Credentials { user: user_from_row(&row)?, password_hash: row.try_get("password_hash")? })),
        None => Ok(None),
    }
}
