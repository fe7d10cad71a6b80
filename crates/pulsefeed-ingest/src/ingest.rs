//! Per-feed ingestion: parse, deduplicate, commit.

use chrono::Utc;
use chrono_tz::Tz;
use pulsefeed_db::{ArticleRow, DbError, EntityStore, FeedMetadataUpdate, FeedRow, NewArticle};
use tracing::{debug, info};

use crate::entry::{parse_entry, EntryOutcome};
use crate::fetch::FetchedFeed;

/// Upper bound on entries ingested from one document. Feeds that republish
/// their whole archive on every poll would otherwise flood each cycle.
pub const MAX_ENTRIES_PER_FEED: usize = 20;

/// Ingests one fetched document for one feed.
///
/// Entries beyond [`MAX_ENTRIES_PER_FEED`] are ignored. Each remaining
/// entry is normalized, then deduplicated twice: against articles already
/// admitted in this batch (a document may repeat a link), and against the
/// store by link or by title and published instant. Whatever survives is
/// committed atomically together with the feed's metadata refresh, so a
/// feed whose document yields nothing new still gets `last_updated`
/// advanced.
///
/// # Errors
///
/// Returns [`DbError`] when a dedup probe or the commit fails. Nothing is
/// persisted in that case.
pub async fn ingest_feed<S: EntityStore + ?Sized>(
    store: &S,
    feed: &FeedRow,
    fetched: &FetchedFeed,
    tz: Tz,
) -> Result<Vec<ArticleRow>, DbError> {
    let mut admitted: Vec<NewArticle> = Vec::new();
    let mut skipped = 0_usize;
    let mut duplicates = 0_usize;

    for raw in fetched.entries.iter().take(MAX_ENTRIES_PER_FEED) {
        let article = match parse_entry(raw, feed.id, tz) {
            EntryOutcome::Parsed(article) => article,
            EntryOutcome::Skipped(reason) => {
                debug!(feed_id = feed.id, url = %feed.url, %reason, "skipping entry");
                skipped += 1;
                continue;
            }
        };

        // The same document can carry one story twice; admitting both
        // would trip the unique link constraint and roll the batch back.
        let seen_in_batch = admitted.iter().any(|a| {
            a.link == article.link
                || (a.title == article.title && a.published_at == article.published_at)
        });
        if seen_in_batch {
            duplicates += 1;
            continue;
        }

        let existing = store
            .find_article_by_link_or_title_date(&article.link, &article.title, article.published_at)
            .await?;
        if existing.is_some() {
            duplicates += 1;
            continue;
        }

        admitted.push(article);
    }

    let metadata = FeedMetadataUpdate {
        title: fetched.title.clone(),
        description: fetched.description.clone(),
        last_updated: Utc::now(),
    };
    let stored = store
        .commit_feed_ingestion(feed.id, &metadata, &admitted)
        .await?;

    info!(
        feed_id = feed.id,
        url = %feed.url,
        new_articles = stored.len(),
        duplicates,
        skipped,
        "feed ingested"
    );
    Ok(stored)
}
