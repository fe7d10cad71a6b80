//! Per-entry normalization.
//!
//! A fetched document yields [`RawEntry`] values, which carry whatever the
//! feed happened to supply. [`parse_entry`] turns each one into either a
//! storable [`NewArticle`] or an explicit skip with the reason attached,
//! so callers can log exactly why an entry was dropped.

use std::fmt;

use chrono::Utc;
use chrono_tz::Tz;
use pulsefeed_db::NewArticle;

use crate::html::strip_html;
use crate::time::{published_instant, FeedTimestamp};

/// One entry as lifted from a parsed feed document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published: Option<FeedTimestamp>,
    pub updated: Option<FeedTimestamp>,
}

/// Why an entry was rejected during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingLink,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "entry has no title"),
            Self::MissingLink => write!(f, "entry has no link"),
        }
    }
}

/// Result of normalizing a single entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// The entry is complete enough to store.
    Parsed(NewArticle),
    /// The entry was dropped, with the reason.
    Skipped(SkipReason),
}

/// Normalizes one raw entry into a storable article.
///
/// Title and link are mandatory; an entry missing either (or carrying only
/// whitespace) is skipped rather than stored half-formed. The published
/// instant is resolved in `tz` and stored as UTC. Content falls back to the
/// summary when the feed carries no body, and the description is the
/// summary with markup stripped.
#[must_use]
pub fn parse_entry(raw: &RawEntry, feed_id: i64, tz: Tz) -> EntryOutcome {
    let Some(title) = raw.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return EntryOutcome::Skipped(SkipReason::MissingTitle);
    };
    let Some(link) = raw.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) else {
        return EntryOutcome::Skipped(SkipReason::MissingLink);
    };

    let published_at = published_instant(raw.published.as_ref(), raw.updated.as_ref(), tz)
        .with_timezone(&Utc);

    let description = raw
        .summary
        .as_deref()
        .map(strip_html)
        .filter(|d| !d.is_empty());
    let content = raw.content.clone().or_else(|| raw.summary.clone());

    EntryOutcome::Parsed(NewArticle {
        feed_id,
        title: title.to_string(),
        link: link.to_string(),
        description,
        content,
        author: raw.author.clone(),
        published_at,
        is_new: true,
    })
}
