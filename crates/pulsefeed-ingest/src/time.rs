//! Timestamp normalization.
//!
//! Feed documents carry published/updated dates as broken-down UTC
//! wall-clock components; storage and dedup want one concrete instant in
//! the deployment's configured zone. Absence never fails: a dateless entry
//! is stamped with "now".

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Broken-down UTC wall-clock components of a feed-supplied date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl FeedTimestamp {
    /// Decomposes an already-parsed instant into its UTC components.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
            minute: instant.minute(),
            second: instant.second(),
        }
    }

    /// Reassembles the components into an instant, or `None` when they do
    /// not name a real UTC time (month 13, February 30th, hour 25, ...).
    #[must_use]
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
        .single()
    }
}

/// Resolves an entry's published instant in the configured zone.
///
/// Prefers `published` over `updated`; when neither is present (or neither
/// names a real time) the current instant is used. There is no error path.
#[must_use]
pub fn published_instant(
    published: Option<&FeedTimestamp>,
    updated: Option<&FeedTimestamp>,
    tz: Tz,
) -> DateTime<Tz> {
    published
        .and_then(FeedTimestamp::to_utc)
        .or_else(|| updated.and_then(FeedTimestamp::to_utc))
        .map_or_else(
            || Utc::now().with_timezone(&tz),
            |utc| utc.with_timezone(&tz),
        )
}
