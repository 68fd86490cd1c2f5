use std::collections::HashMap;

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{parse_id, reviews, users};
use crate::error::AppResult;
use crate::types::{Campground, CampgroundDetail, CampgroundInput, GeoPoint, ImageRef};

const CAMPGROUND_COLUMNS: &str = "id, title, description, price, location, longitude, latitude, author_id";

fn campground_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<Campground> {
    let longitude: Option<f64> = row.try_get("longitude")?;
    let latitude: Option<f64> = row.try_get("latitude")?;
    let author_id: Option<String> = row.try_get("author_id")?;
    Ok(Campground {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        location: row.try_get("location")?,
        geometry: match (longitude, latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint { longitude, latitude }),
            _ => None,
        },
        images: Vec::new(),
        author_id: author_id.as_deref().map(parse_id).transpose()?,
    })
}

/// Storage key for a newly attached image.
pub fn new_image_key() -> String {
    format!("YelpCamp/{}", Uuid::new_v4().simple())
}

async fn images_for(pool: &SqlitePool, id: Uuid) -> AppResult<Vec<ImageRef>> {
    let rows = sqlx::query(
        "SELECT url, filename FROM campground_images WHERE campground_id = ?1 ORDER BY position ASC, id ASC",
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|r| Ok(ImageRef { url: r.try_get("url")?, filename: r.try_get("filename")? }))
        .collect()
}

/// All campgrounds, newest first, with their images.
pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Campground>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM campgrounds ORDER BY created_at DESC, rowid DESC",
        CAMPGROUND_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    let mut campgrounds = rows.iter().map(campground_from_row).collect::<AppResult<Vec<_>>>()?;

    let image_rows = sqlx::query(
        "SELECT campground_id, url, filename FROM campground_images ORDER BY campground_id, position ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;
    let mut by_campground: HashMap<String, Vec<ImageRef>> = HashMap::new();
    for r in &image_rows {
        by_campground
            .entry(r.try_get("campground_id")?)
            .or_default()
            .push(ImageRef { url: r.try_get("url")?, filename: r.try_get("filename")? });
    }
    for c in &mut campgrounds {
        if let Some(images) = by_campground.remove(&c.id.to_string()) {
            c.images = images;
        }
    }
    Ok(campgrounds)
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM campgrounds").fetch_one(pool).await?)
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Campground>> {
    let row = sqlx::query(&format!("SELECT {} FROM campgrounds WHERE id = ?1", CAMPGROUND_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let mut campground = campground_from_row(&row)?;
    campground.images = images_for(pool, id).await?;
    Ok(Some(campground))
}

/// The campground with its author and reviews populated.
pub async fn find_detail(pool: &SqlitePool, id: Uuid) -> AppResult<Option<CampgroundDetail>> {
    let Some(campground) = find(pool, id).await? else { return Ok(None) };
    let author = match campground.author_id {
        Some(author_id) => users::find_by_id(pool, author_id).await?,
        None => None,
    };
    let reviews = reviews::list_for_campground(pool, id).await?;
    Ok(Some(CampgroundDetail { campground, author, reviews }))
}

/// Appends uploaded images (keys already assigned) followed by linked URLs,
/// which get a fresh key each.
async fn append_images(tx: &mut Transaction<'_, Sqlite>, id: Uuid, input: &CampgroundInput) -> AppResult<()> {
    let linked = input.images.iter().map(|url| ImageRef { url: url.clone(), filename: new_image_key() });
    let images: Vec<ImageRef> = input.uploaded.iter().cloned().chain(linked).collect();
    if images.is_empty() {
        return Ok(());
    }
    let next: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM campground_images WHERE campground_id = ?1",
    )
    .bind(id.to_string())
    .fetch_one(&mut **tx)
    .await?;
    for (offset, image) in images.iter().enumerate() {
        sqlx::query("INSERT INTO campground_images (campground_id, position, url, filename) VALUES (?1, ?2, ?3, ?4)")
            .bind(id.to_string())
            .bind(next + offset as i64)
            .bind(&image.url)
            .bind(&image.filename)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn insert(
    pool: &SqlitePool,
    author_id: Uuid,
    input: &CampgroundInput,
    geometry: Option<GeoPoint>,
) -> AppResult<Campground> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"INSERT INTO campgrounds (id, title, description, price, location, longitude, latitude, author_id)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
    )
    .bind(id.to_string())
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.location)
    .bind(geometry.map(|g| g.longitude))
    .bind(geometry.map(|g| g.latitude))
    .bind(author_id.to_string())
    .execute(&mut *tx)
    .await?;
    append_images(&mut tx, id, input).await?;
    tx.commit().await?;

    find(pool, id).await?.ok_or_else(|| anyhow::anyhow!("campground {} vanished after insert", id).into())
}

/// Overwrites the editable fields, drops images listed in `delete_images`
/// and appends new image URLs after the existing ones.
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    input: &CampgroundInput,
    geometry: Option<GeoPoint>,
) -> AppResult<Option<Campground>> {
    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        r#"UPDATE campgrounds
           SET title = ?2, description = ?3, price = ?4, location = ?5, longitude = ?6, latitude = ?7
           WHERE id = ?1"#,
    )
    .bind(id.to_string())
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.location)
    .bind(geometry.map(|g| g.longitude))
    .bind(geometry.map(|g| g.latitude))
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Ok(None);
    }
    for filename in &input.delete_images {
        sqlx::query("DELETE FROM campground_images WHERE campground_id = ?1 AND filename = ?2")
            .bind(id.to_string())
            .bind(filename)
            .execute(&mut *tx)
            .await?;
    }
    append_images(&mut tx, id, input).await?;
    tx.commit().await?;
    find(pool, id).await
}

/// Deletes the campground together with its reviews and images.
/// Returns `false` when nothing was deleted.
pub async fn delete(pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    let mut tx = pool.begin().await?;
    let reviews = sqlx::query("DELETE FROM reviews WHERE campground_id = ?1")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM campground_images WHERE campground_id = ?1")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM campgrounds WHERE id = ?1")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    if deleted > 0 {
        tracing::debug!(campground = %id, reviews, "Deleted campground");
    }
    Ok(deleted > 0)
}
