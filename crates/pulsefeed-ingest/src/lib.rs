//! The feed-fetch-parse-dedup-persist pipeline and its scheduling.
//!
//! Data flows bottom-up through the modules: [`time`] and [`html`] normalize
//! raw entry fields, [`entry`] turns one raw entry into a candidate article,
//! [`fetch`] pulls and parses whole feed documents under a concurrency
//! limit, [`ingest`] dedups and commits one feed's batch atomically,
//! [`fleet`] fans out over every active feed and runs the staleness sweep,
//! and [`scheduler`] drives the whole thing on a fixed interval with
//! single-flight protection.

pub mod entry;
pub mod error;
pub mod fetch;
pub mod fleet;
mod html;
pub mod ingest;
pub mod scheduler;
pub mod time;

pub use entry::{parse_entry, EntryOutcome, RawEntry, SkipReason};
pub use error::FetchError;
pub use fetch::{FeedFetcher, FetchedFeed};
pub use fleet::{run_cycle, CycleSummary, FeedOutcome};
pub use ingest::{ingest_feed, MAX_ENTRIES_PER_FEED};
pub use scheduler::{run_tick, FeedScheduler};
pub use time::{published_instant, FeedTimestamp};
