//! One update cycle across every active feed.
//!
//! Feeds are polled concurrently (the fetcher's semaphore bounds actual
//! parallelism) and each feed's outcome is isolated: a dead host or a bad
//! document costs that feed its update, nothing more. The cycle ends with
//! the freshness sweep that ages stale articles out of `is_new`.

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use pulsefeed_db::{ArticleRow, DbError, EntityStore, FeedRow};
use tracing::{error, info, warn};

use crate::fetch::FeedFetcher;
use crate::ingest::ingest_feed;

/// How one feed fared within a cycle.
#[derive(Debug)]
pub enum FeedOutcome {
    /// Fetched, deduplicated, and committed; carries the stored articles.
    Updated(Vec<ArticleRow>),
    /// Download or parse failed; detail was already logged by the fetcher.
    FetchFailed,
    /// Fetched fine but the database rejected the commit.
    CommitFailed(DbError),
}

/// Aggregate result of one cycle.
///
/// Carries every article admitted during the cycle, not just the count;
/// downstream notification consumers fan the rows out to subscribers.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub new_articles: Vec<ArticleRow>,
    pub feeds_updated: usize,
    pub feeds_failed: usize,
    pub articles_aged: u64,
}

/// Runs one full update cycle: poll every active feed, then sweep.
///
/// # Errors
///
/// Returns [`DbError`] only when the active-feed listing itself fails;
/// without it there is no cycle to run. Per-feed failures and a failed
/// sweep are absorbed into the summary.
pub async fn run_cycle<S: EntityStore>(
    store: &S,
    fetcher: &FeedFetcher,
    tz: Tz,
    freshness_window_hours: i64,
) -> Result<CycleSummary, DbError> {
    let feeds = store.list_active_feeds().await?;
    info!(feeds = feeds.len(), "starting update cycle");

    let outcomes = join_all(
        feeds
            .iter()
            .map(|feed| poll_feed(store, fetcher, feed, tz)),
    )
    .await;

    let mut summary = CycleSummary::default();
    for (feed, outcome) in feeds.iter().zip(outcomes) {
        match outcome {
            FeedOutcome::Updated(mut articles) => {
                summary.feeds_updated += 1;
                summary.new_articles.append(&mut articles);
            }
            FeedOutcome::FetchFailed => {
                summary.feeds_failed += 1;
            }
            FeedOutcome::CommitFailed(e) => {
                summary.feeds_failed += 1;
                error!(feed_id = feed.id, url = %feed.url, error = %e, "feed commit failed");
            }
        }
    }

    summary.articles_aged = sweep_stale(store, freshness_window_hours).await;

    info!(
        feeds_updated = summary.feeds_updated,
        feeds_failed = summary.feeds_failed,
        new_articles = summary.new_articles.len(),
        articles_aged = summary.articles_aged,
        "update cycle finished"
    );
    Ok(summary)
}

async fn poll_feed<S: EntityStore>(
    store: &S,
    fetcher: &FeedFetcher,
    feed: &FeedRow,
    tz: Tz,
) -> FeedOutcome {
    let Some(fetched) = fetcher.fetch(&feed.url).await else {
        return FeedOutcome::FetchFailed;
    };
    match ingest_feed(store, feed, &fetched, tz).await {
        Ok(articles) => FeedOutcome::Updated(articles),
        Err(e) => FeedOutcome::CommitFailed(e),
    }
}

/// Ages out still-new articles published before the freshness window.
/// A sweep failure is logged and reported as zero; the next cycle will
/// catch up because the sweep is monotonic.
async fn sweep_stale<S: EntityStore>(store: &S, window_hours: i64) -> u64 {
    let cutoff = Utc::now() - Duration::hours(window_hours);
    match store.mark_articles_not_new_before(cutoff).await {
        Ok(aged) => aged,
        Err(e) => {
            warn!(error = %e, "freshness sweep failed");
            0
        }
    }
}
