//! Local username/password strategy.
//!
//! Passwords are hashed with bcrypt on the blocking pool so request workers
//! are never stalled by the key-stretching.

use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::store::users;
use crate::types::{RegisterForm, User};

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

/// Creates a user account. Duplicate usernames or emails come back as `Conflict`.
pub async fn register(pool: &SqlitePool, form: &RegisterForm, cost: u32) -> AppResult<User> {
    let username = form.username.trim();
    let email = form.email.trim();
    if username.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest("Username, email and password are required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest(format!("\"email\" must be a valid email, got {:?}", email)));
    }
    let hash = hash_password(&form.password, cost).await?;
    users::insert(pool, username, email, &hash).await.map_err(|e| match e {
        AppError::Conflict(_) => {
            AppError::Conflict("A user with the given username or email is already registered".to_string())
        }
        other => other,
    })
}

/// Checks a username/password pair. `Ok(None)` means the credentials were wrong.
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> AppResult<Option<User>> {
    let Some(creds) = users::find_credentials(pool, username.trim()).await? else {
        return Ok(None);
    };
    if verify_password(password, &creds.password_hash).await? {
        Ok(Some(creds.user))
    } else {
        Ok(None)
    }
}
