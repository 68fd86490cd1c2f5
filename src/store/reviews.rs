use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_id;
use crate::error::AppResult;
use crate::types::{Review, ReviewInput, ReviewView};

fn review_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Review> {
    Ok(Review {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        campground_id: parse_id(&row.try_get::<String, _>("campground_id")?)?,
        author_id: parse_id(&row.try_get::<String, _>("author_id")?)?,
        body: row.try_get("body")?,
        rating: row.try_get("rating")?,
    })
}

pub async fn list_for_campground(pool: &SqlitePool, campground_id: Uuid) -> AppResult<Vec<ReviewView>> {
    let rows = sqlx::query(
        r#"SELECT r.id, r.campground_id, r.author_id, r.body, r.rating, u.username
           FROM reviews r JOIN users u ON u.id = r.author_id
           WHERE r.campground_id = ?1
           ORDER BY r.created_at ASC, r.rowid ASC"#,
    )
    .bind(campground_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|r| Ok(ReviewView { review: review_from_row(r)?, author: r.try_get("username")? }))
        .collect()
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Review>> {
    let row = sqlx::query("SELECT id, campground_id, author_id, body, rating FROM reviews WHERE id = ?1")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(review_from_row).transpose()
}

#[cfg(test)]
pub(crate) async fn count_for_campground(pool: &SqlitePool, campground_id: Uuid) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE campground_id = ?1")
        .bind(campground_id.to_string())
        .fetch_one(pool)
        .await?)
}

pub async fn insert(pool: &SqlitePool, campground_id: Uuid, author_id: Uuid, input: &ReviewInput) -> AppResult<Review> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO reviews (id, campground_id, author_id, body, rating) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(id.to_string())
        .bind(campground_id.to_string())
        .bind(author_id.to_string())
        .bind(&input.body)
        .bind(input.rating)
        .execute(pool)
        .await?;
    Ok(Review { id, campground_id, author_id, body: input.body.clone(), rating: input.rating })
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    let deleted = sqlx::query("DELETE FROM reviews WHERE id = ?1")
        .bind(id.to_string())
        .execute(pool)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}
