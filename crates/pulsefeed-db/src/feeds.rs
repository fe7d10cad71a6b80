//! Database operations for the `feeds` table, including the atomic
//! per-feed ingestion commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::articles::{insert_article_tx, ArticleRow, NewArticle};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `feeds` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedRow {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Input for creating a feed. `url` is the unique natural key.
#[derive(Debug, Clone)]
pub struct NewFeed<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

/// Partial update for a feed; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct FeedUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_active: Option<bool>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Feed-level metadata refresh applied by every successful fetch cycle.
///
/// `title` and `description` are only written when the fetched document
/// provided them; `last_updated` is always stamped.
#[derive(Debug, Clone)]
pub struct FeedMetadataUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a feed and returns the created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique-constraint
/// violation on `url`.
pub async fn create_feed(pool: &PgPool, feed: &NewFeed<'_>) -> Result<FeedRow, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "INSERT INTO feeds (url, title, description) \
         VALUES ($1, $2, $3) \
         RETURNING id, url, title, description, last_updated, created_at, is_active",
    )
    .bind(feed.url)
    .bind(feed.title)
    .bind(feed.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a feed by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_feed(pool: &PgPool, feed_id: i64) -> Result<Option<FeedRow>, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "SELECT id, url, title, description, last_updated, created_at, is_active \
         FROM feeds WHERE id = $1",
    )
    .bind(feed_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a feed by its unique URL, or `None` if not subscribed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_feed_by_url(pool: &PgPool, url: &str) -> Result<Option<FeedRow>, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "SELECT id, url, title, description, last_updated, created_at, is_active \
         FROM feeds WHERE url = $1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns all feeds with `is_active = true`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_feeds(pool: &PgPool) -> Result<Vec<FeedRow>, DbError> {
    let rows = sqlx::query_as::<_, FeedRow>(
        "SELECT id, url, title, description, last_updated, created_at, is_active \
         FROM feeds WHERE is_active = true ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Applies a partial update to a feed and returns the updated row, or `None`
/// if the feed does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_feed(
    pool: &PgPool,
    feed_id: i64,
    update: &FeedUpdate<'_>,
) -> Result<Option<FeedRow>, DbError> {
    let row = sqlx::query_as::<_, FeedRow>(
        "UPDATE feeds SET \
           title = COALESCE($2, title), \
           description = COALESCE($3, description), \
           is_active = COALESCE($4, is_active), \
           last_updated = COALESCE($5, last_updated) \
         WHERE id = $1 \
         RETURNING id, url, title, description, last_updated, created_at, is_active",
    )
    .bind(feed_id)
    .bind(update.title)
    .bind(update.description)
    .bind(update.is_active)
    .bind(update.last_updated)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Commits one feed's ingestion batch as a single transaction: refresh the
/// feed's metadata, then insert every admitted article. Any failure,
/// including a unique-constraint violation on one article, rolls the whole
/// batch back, so a feed's cycle either lands completely or not at all.
///
/// Returns the inserted article rows in input order.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the feed does not exist, or
/// [`DbError::Sqlx`] if any statement in the transaction fails.
pub async fn commit_feed_ingestion(
    pool: &PgPool,
    feed_id: i64,
    metadata: &FeedMetadataUpdate,
    articles: &[NewArticle],
) -> Result<Vec<ArticleRow>, DbError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE feeds SET \
           title = COALESCE($2, title), \
           description = COALESCE($3, description), \
           last_updated = $4 \
         WHERE id = $1",
    )
    .bind(feed_id)
    .bind(metadata.title.as_deref())
    .bind(metadata.description.as_deref())
    .bind(metadata.last_updated)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    let mut inserted = Vec::with_capacity(articles.len());
    for article in articles {
        inserted.push(insert_article_tx(&mut tx, article).await?);
    }

    tx.commit().await?;
    Ok(inserted)
}
