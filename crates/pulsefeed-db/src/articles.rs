//! Database operations for the `articles` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `articles` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_new: bool,
}

/// A candidate article produced by the entry parser, not yet admitted.
///
/// `link` is the unique natural key; `(title, published_at)` is the alternate
/// dedup identity. `published_at` is already normalized to a concrete instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub is_new: bool,
}

/// Filters for [`list_articles`]; `None` fields match everything.
#[derive(Debug, Clone)]
pub struct ArticleFilter<'a> {
    pub feed_id: Option<i64>,
    pub is_new: Option<bool>,
    /// Case-insensitive substring match over title, description and content.
    pub search: Option<&'a str>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ArticleFilter<'_> {
    fn default() -> Self {
        Self {
            feed_id: None,
            is_new: None,
            search: None,
            published_after: None,
            published_before: None,
            limit: 50,
            offset: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a single article and returns the created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a
/// unique-constraint violation on `link`.
pub async fn create_article(pool: &PgPool, article: &NewArticle) -> Result<ArticleRow, DbError> {
    let mut tx = pool.begin().await?;
    let row = insert_article_tx(&mut tx, article).await?;
    tx.commit().await?;
    Ok(row)
}

/// Inserts an article inside an open transaction. Used by the per-feed
/// ingestion commit so the whole batch shares one transaction.
pub(crate) async fn insert_article_tx(
    tx: &mut Transaction<'_, Postgres>,
    article: &NewArticle,
) -> Result<ArticleRow, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(
        "INSERT INTO articles \
           (feed_id, title, link, description, content, author, published_at, is_new) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, feed_id, title, link, description, content, author, \
                   published_at, created_at, updated_at, is_new",
    )
    .bind(article.feed_id)
    .bind(&article.title)
    .bind(&article.link)
    .bind(article.description.as_deref())
    .bind(article.content.as_deref())
    .bind(article.author.as_deref())
    .bind(article.published_at)
    .bind(article.is_new)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

/// Dedup probe: returns an existing article whose `link` matches, or whose
/// `title` and `published_at` both match, whichever is found first.
///
/// Deliberately not scoped by feed: the same story syndicated through two
/// feeds is treated as one article.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_article_by_link_or_title_date(
    pool: &PgPool,
    link: &str,
    title: &str,
    published_at: DateTime<Utc>,
) -> Result<Option<ArticleRow>, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, feed_id, title, link, description, content, author, \
                published_at, created_at, updated_at, is_new \
         FROM articles \
         WHERE link = $1 OR (title = $2 AND published_at = $3) \
         LIMIT 1",
    )
    .bind(link)
    .bind(title)
    .bind(published_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns articles matching the filter, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_articles(
    pool: &PgPool,
    filter: &ArticleFilter<'_>,
) -> Result<Vec<ArticleRow>, DbError> {
    let search_pattern = filter.search.map(|s| format!("%{s}%"));

    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, feed_id, title, link, description, content, author, \
                published_at, created_at, updated_at, is_new \
         FROM articles \
         WHERE ($1::BIGINT IS NULL OR feed_id = $1) \
           AND ($2::BOOLEAN IS NULL OR is_new = $2) \
           AND ($3::TEXT IS NULL OR title ILIKE $3 \
                OR description ILIKE $3 OR content ILIKE $3) \
           AND ($4::TIMESTAMPTZ IS NULL OR published_at >= $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR published_at <= $5) \
         ORDER BY published_at DESC \
         LIMIT $6 OFFSET $7",
    )
    .bind(filter.feed_id)
    .bind(filter.is_new)
    .bind(search_pattern)
    .bind(filter.published_after)
    .bind(filter.published_before)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// External-edit update: rewrites the mutable article fields and stamps
/// `updated_at`. Not used by the ingestion pipeline, which is create-only.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn touch_article(
    pool: &PgPool,
    article_id: i64,
    title: Option<&str>,
    description: Option<&str>,
    content: Option<&str>,
) -> Result<Option<ArticleRow>, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(
        "UPDATE articles SET \
           title = COALESCE($2, title), \
           description = COALESCE($3, description), \
           content = COALESCE($4, content), \
           updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, feed_id, title, link, description, content, author, \
                   published_at, created_at, updated_at, is_new",
    )
    .bind(article_id)
    .bind(title)
    .bind(description)
    .bind(content)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Staleness sweep: flips `is_new` to false for every article still marked
/// new whose `published_at` is older than `cutoff`. One statement, so the
/// whole sweep commits (and locks) as a single batch. Returns the number of
/// articles aged out.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mark_articles_not_new_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE articles SET is_new = false \
         WHERE is_new = true AND published_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
