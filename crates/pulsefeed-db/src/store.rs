//! The persistence seam consumed by the ingestion pipeline.
//!
//! The pipeline never talks to `sqlx` directly; it goes through
//! [`EntityStore`] so tests can substitute an in-memory implementation.
//! [`PgStore`] is the production implementation and delegates to the free
//! query functions in this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::articles::{ArticleFilter, ArticleRow, NewArticle};
use crate::feeds::{FeedMetadataUpdate, FeedRow, FeedUpdate, NewFeed};
use crate::DbError;

/// Durable storage for feeds and articles.
///
/// All implementations must be `Send + Sync`; the fleet updater calls these
/// methods from concurrently polled per-feed futures.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates a feed. Fails if the URL is already subscribed.
    async fn create_feed(&self, feed: &NewFeed<'_>) -> Result<FeedRow, DbError>;

    /// Looks a feed up by its unique URL.
    async fn get_feed_by_url(&self, url: &str) -> Result<Option<FeedRow>, DbError>;

    /// Returns every feed with `is_active = true`.
    async fn list_active_feeds(&self) -> Result<Vec<FeedRow>, DbError>;

    /// Applies a partial update to a feed. `None` fields keep their value.
    async fn update_feed(
        &self,
        feed_id: i64,
        update: &FeedUpdate<'_>,
    ) -> Result<Option<FeedRow>, DbError>;

    /// Admits a single article outside an ingestion batch.
    async fn create_article(&self, article: &NewArticle) -> Result<ArticleRow, DbError>;

    /// Dedup probe: an existing article with the same `link`, or with the
    /// same `title` and `published_at` pair. Not scoped by feed; a story
    /// syndicated through two feeds counts as one article.
    async fn find_article_by_link_or_title_date(
        &self,
        link: &str,
        title: &str,
        published_at: DateTime<Utc>,
    ) -> Result<Option<ArticleRow>, DbError>;

    /// Returns articles matching the filter, newest first.
    async fn list_articles(&self, filter: &ArticleFilter<'_>) -> Result<Vec<ArticleRow>, DbError>;

    /// Flips `is_new` to false for every still-new article published before
    /// `cutoff`, as one atomic batch. Returns how many were aged out.
    async fn mark_articles_not_new_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError>;

    /// Atomic per-feed commit: feed metadata refresh plus all admitted
    /// articles land together or not at all.
    async fn commit_feed_ingestion(
        &self,
        feed_id: i64,
        metadata: &FeedMetadataUpdate,
        articles: &[NewArticle],
    ) -> Result<Vec<ArticleRow>, DbError>;
}

/// Postgres-backed [`EntityStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_feed(&self, feed: &NewFeed<'_>) -> Result<FeedRow, DbError> {
        crate::feeds::create_feed(&self.pool, feed).await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<FeedRow>, DbError> {
        crate::feeds::get_feed_by_url(&self.pool, url).await
    }

    async fn list_active_feeds(&self) -> Result<Vec<FeedRow>, DbError> {
        crate::feeds::list_active_feeds(&self.pool).await
    }

    async fn update_feed(
        &self,
        feed_id: i64,
        update: &FeedUpdate<'_>,
    ) -> Result<Option<FeedRow>, DbError> {
        crate::feeds::update_feed(&self.pool, feed_id, update).await
    }

    async fn create_article(&self, article: &NewArticle) -> Result<ArticleRow, DbError> {
        crate::articles::create_article(&self.pool, article).await
    }

    async fn find_article_by_link_or_title_date(
        &self,
        link: &str,
        title: &str,
        published_at: DateTime<Utc>,
    ) -> Result<Option<ArticleRow>, DbError> {
        crate::articles::find_article_by_link_or_title_date(&self.pool, link, title, published_at)
            .await
    }

    async fn list_articles(&self, filter: &ArticleFilter<'_>) -> Result<Vec<ArticleRow>, DbError> {
        crate::articles::list_articles(&self.pool, filter).await
    }

    async fn mark_articles_not_new_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        crate::articles::mark_articles_not_new_before(&self.pool, cutoff).await
    }

    async fn commit_feed_ingestion(
        &self,
        feed_id: i64,
        metadata: &FeedMetadataUpdate,
        articles: &[NewArticle],
    ) -> Result<Vec<ArticleRow>, DbError> {
        crate::feeds::commit_feed_ingestion(&self.pool, feed_id, metadata, articles).await
    }
}
