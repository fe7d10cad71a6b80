//! In-memory [`EntityStore`] used by the pipeline tests.
//!
//! Mirrors the schema-level guarantees the pipeline depends on: unique
//! article links, the cross-feed dedup probe, and all-or-nothing per-feed
//! commits. State lives behind an `Arc` so clones observe the same data,
//! matching how `PgStore` clones share one pool.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsefeed_db::{
    ArticleFilter, ArticleRow, DbError, EntityStore, FeedMetadataUpdate, FeedRow, FeedUpdate,
    NewArticle, NewFeed,
};

#[derive(Debug, Default)]
struct State {
    feeds: Vec<FeedRow>,
    articles: Vec<ArticleRow>,
    next_feed_id: i64,
    next_article_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an active feed and returns its row.
    pub fn seed_feed(&self, url: &str, title: &str) -> FeedRow {
        let mut state = self.state.lock().unwrap();
        state.next_feed_id += 1;
        let row = FeedRow {
            id: state.next_feed_id,
            url: url.to_string(),
            title: title.to_string(),
            description: None,
            last_updated: None,
            created_at: Utc::now(),
            is_active: true,
        };
        state.feeds.push(row.clone());
        row
    }

    pub fn articles(&self) -> Vec<ArticleRow> {
        self.state.lock().unwrap().articles.clone()
    }

    pub fn feed(&self, feed_id: i64) -> Option<FeedRow> {
        self.state
            .lock()
            .unwrap()
            .feeds
            .iter()
            .find(|f| f.id == feed_id)
            .cloned()
    }
}

fn unique_violation(link: &str) -> DbError {
    DbError::Sqlx(sqlx::Error::Protocol(format!(
        "duplicate key value violates unique constraint: link {link}"
    )))
}

fn insert_article(state: &mut State, article: &NewArticle) -> Result<ArticleRow, DbError> {
    if state.articles.iter().any(|a| a.link == article.link) {
        return Err(unique_violation(&article.link));
    }
    state.next_article_id += 1;
    let row = ArticleRow {
        id: state.next_article_id,
        feed_id: article.feed_id,
        title: article.title.clone(),
        link: article.link.clone(),
        description: article.description.clone(),
        content: article.content.clone(),
        author: article.author.clone(),
        published_at: article.published_at,
        created_at: Utc::now(),
        updated_at: None,
        is_new: article.is_new,
    };
    state.articles.push(row.clone());
    Ok(row)
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_feed(&self, feed: &NewFeed<'_>) -> Result<FeedRow, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.feeds.iter().any(|f| f.url == feed.url) {
            return Err(DbError::Sqlx(sqlx::Error::Protocol(format!(
                "duplicate key value violates unique constraint: url {}",
                feed.url
            ))));
        }
        state.next_feed_id += 1;
        let row = FeedRow {
            id: state.next_feed_id,
            url: feed.url.to_string(),
            title: feed.title.to_string(),
            description: feed.description.map(str::to_string),
            last_updated: None,
            created_at: Utc::now(),
            is_active: true,
        };
        state.feeds.push(row.clone());
        Ok(row)
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<FeedRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.feeds.iter().find(|f| f.url == url).cloned())
    }

    async fn list_active_feeds(&self) -> Result<Vec<FeedRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state.feeds.iter().filter(|f| f.is_active).cloned().collect())
    }

    async fn update_feed(
        &self,
        feed_id: i64,
        update: &FeedUpdate<'_>,
    ) -> Result<Option<FeedRow>, DbError> {
        let mut state = self.state.lock().unwrap();
        let Some(feed) = state.feeds.iter_mut().find(|f| f.id == feed_id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            feed.title = title.to_string();
        }
        if let Some(description) = update.description {
            feed.description = Some(description.to_string());
        }
        if let Some(is_active) = update.is_active {
            feed.is_active = is_active;
        }
        if let Some(last_updated) = update.last_updated {
            feed.last_updated = Some(last_updated);
        }
        Ok(Some(feed.clone()))
    }

    async fn create_article(&self, article: &NewArticle) -> Result<ArticleRow, DbError> {
        let mut state = self.state.lock().unwrap();
        insert_article(&mut state, article)
    }

    async fn find_article_by_link_or_title_date(
        &self,
        link: &str,
        title: &str,
        published_at: DateTime<Utc>,
    ) -> Result<Option<ArticleRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .iter()
            .find(|a| a.link == link || (a.title == title && a.published_at == published_at))
            .cloned())
    }

    async fn list_articles(&self, filter: &ArticleFilter<'_>) -> Result<Vec<ArticleRow>, DbError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<ArticleRow> = state
            .articles
            .iter()
            .filter(|a| filter.feed_id.is_none_or(|id| a.feed_id == id))
            .filter(|a| filter.is_new.is_none_or(|n| a.is_new == n))
            .filter(|a| {
                filter.published_after.is_none_or(|t| a.published_at > t)
            })
            .filter(|a| {
                filter.published_before.is_none_or(|t| a.published_at < t)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn mark_articles_not_new_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let mut aged = 0_u64;
        for article in &mut state.articles {
            if article.is_new && article.published_at < cutoff {
                article.is_new = false;
                aged += 1;
            }
        }
        Ok(aged)
    }

    async fn commit_feed_ingestion(
        &self,
        feed_id: i64,
        metadata: &FeedMetadataUpdate,
        articles: &[NewArticle],
    ) -> Result<Vec<ArticleRow>, DbError> {
        let mut state = self.state.lock().unwrap();
        if !state.feeds.iter().any(|f| f.id == feed_id) {
            return Err(DbError::NotFound);
        }

        // Stage into a scratch copy so a mid-batch failure leaves the
        // store untouched, like the real transaction rollback.
        let mut staged = State {
            feeds: state.feeds.clone(),
            articles: state.articles.clone(),
            next_feed_id: state.next_feed_id,
            next_article_id: state.next_article_id,
        };
        let mut stored = Vec::with_capacity(articles.len());
        for article in articles {
            stored.push(insert_article(&mut staged, article)?);
        }

        let feed = staged
            .feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or(DbError::NotFound)?;
        if let Some(title) = &metadata.title {
            feed.title = title.clone();
        }
        if let Some(description) = &metadata.description {
            feed.description = Some(description.clone());
        }
        feed.last_updated = Some(metadata.last_updated);

        *state = staged;
        Ok(stored)
    }
}
