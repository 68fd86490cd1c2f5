//! Authentication and ownership gates.
//!
//! Each gate is a pure check: it loads what it needs, never writes, and
//! either returns the loaded resource or the failure to show the user.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, AppResult, OptionExt};
use crate::middleware::session::SessionContext;
use crate::store::{campgrounds, reviews};
use crate::types::{campground_path, Campground, Principal, Review};

/// Passes when the request carries a session principal.
pub fn require_session(session: &SessionContext) -> AppResult<&Principal> {
    session.principal.as_ref().ok_or(AppError::Unauthenticated)
}

fn parse_campground_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::campground_not_found())
}

/// Loads the campground or fails with `NotFound`.
pub async fn require_campground(db: &SqlitePool, raw_id: &str) -> AppResult<Campground> {
    let id = parse_campground_id(raw_id)?;
    campgrounds::find(db, id).await?.or_campground_not_found()
}

/// Loads the campground and checks the principal owns it.
pub async fn require_campground_owner(
    db: &SqlitePool,
    principal: &Principal,
    raw_id: &str,
) -> AppResult<Campground> {
    let campground = require_campground(db, raw_id).await?;
    if !campground.is_owned_by(principal.id) {
        tracing::info!(user = %principal.username, campground = %campground.id, "Rejected non-owner");
        return Err(AppError::Forbidden { redirect_to: campground.path() });
    }
    Ok(campground)
}

/// Loads the review, checks it belongs to the campground in the path and was
/// written by the principal.
pub async fn require_review_author(
    db: &SqlitePool,
    principal: &Principal,
    raw_campground_id: &str,
    raw_review_id: &str,
) -> AppResult<Review> {
    let campground_id = parse_campground_id(raw_campground_id)?;
    let back = campground_path(campground_id);
    let review_id = Uuid::parse_str(raw_review_id).map_err(|_| AppError::review_not_found(back.clone()))?;
    let review = match reviews::find(db, review_id).await? {
        Some(r) if r.campground_id == campground_id => r,
        _ => return Err(AppError::review_not_found(back)),
    };
    if review.author_id != principal.id {
        tracing::info!(user = %principal.username, review = %review.id, "Rejected non-author");
        return Err(AppError::Forbidden { redirect_to: back });
    }
    Ok(review)
}
