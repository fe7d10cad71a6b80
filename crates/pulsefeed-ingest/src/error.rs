use thiserror::Error;

/// Why a single feed fetch produced nothing this cycle.
///
/// Every variant is absorbed inside [`crate::fetch::FeedFetcher::fetch`];
/// callers only ever see "no document", never the error itself.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("download limiter closed")]
    LimiterClosed,

    #[error("feed parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}
