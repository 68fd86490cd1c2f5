//! Persistence for users, campgrounds and reviews.
//!
//! Each submodule owns one collection. Ids are UUIDs stored as TEXT.

pub mod campgrounds;
pub mod reviews;
pub mod users;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::Database(format!("corrupt id {:?}: {}", raw, e)))
}
