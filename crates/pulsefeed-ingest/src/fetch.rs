//! Concurrency-bounded feed retrieval.
//!
//! One [`FeedFetcher`] is shared by the whole process. Its semaphore caps
//! how many feed downloads run at once regardless of how many feeds a
//! cycle fans out over, and its HTTP client carries the configured
//! timeout and user agent on every request.

use std::sync::Arc;
use std::time::Duration;

use pulsefeed_core::AppConfig;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::FetchError;
use crate::time::FeedTimestamp;
use crate::RawEntry;

/// A feed document reduced to the fields the pipeline consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// Downloads and parses feed documents under a global concurrency cap.
#[derive(Debug)]
pub struct FeedFetcher {
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
}

impl FeedFetcher {
    /// Builds a fetcher with `max_concurrent` in-flight downloads, a
    /// per-request timeout, and the given `User-Agent` header.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot
    /// be constructed.
    pub fn new(
        max_concurrent: usize,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    /// Builds a fetcher from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot
    /// be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.max_concurrent_fetches,
            config.request_timeout_secs,
            &config.fetch_user_agent,
        )
    }

    /// Number of download slots currently free.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Fetches and parses one feed, returning `None` on any failure.
    ///
    /// A single unreachable or malformed feed must not sink the cycle it
    /// runs in, so transport errors, non-success statuses, and parse
    /// failures are logged here and reduced to `None`.
    pub async fn fetch(&self, url: &str) -> Option<FetchedFeed> {
        match self.fetch_inner(url).await {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!(url, error = %e, "feed fetch failed");
                None
            }
        }
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchedFeed, FetchError> {
        // Permit held for the full download and parse of this feed. The
        // fetcher never closes its own semaphore, so acquisition can only
        // fail if that invariant is broken elsewhere.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let feed = feed_rs::parser::parse(&bytes[..])?;

        Ok(FetchedFeed {
            title: feed.title.map(|t| t.content).filter(|t| !t.is_empty()),
            description: feed
                .description
                .map(|d| d.content)
                .filter(|d| !d.is_empty()),
            entries: feed.entries.iter().map(raw_entry_from).collect(),
        })
    }
}

fn raw_entry_from(entry: &feed_rs::model::Entry) -> RawEntry {
    RawEntry {
        title: entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .filter(|t| !t.is_empty()),
        link: entry.links.first().map(|l| l.href.clone()),
        summary: entry.summary.as_ref().map(|s| s.content.clone()),
        content: entry.content.as_ref().and_then(|c| c.body.clone()),
        author: entry
            .authors
            .first()
            .map(|a| a.name.clone())
            .filter(|n| !n.is_empty()),
        published: entry.published.map(FeedTimestamp::from_datetime),
        updated: entry.updated.map(FeedTimestamp::from_datetime),
    }
}
