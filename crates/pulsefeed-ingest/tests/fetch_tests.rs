//! Fetcher behavior against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use pulsefeed_ingest::{FeedFetcher, FeedTimestamp};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS_TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Chain Pulse</title>
    <description>Block-by-block coverage</description>
    <link>https://example.org</link>
    <item>
      <title>Block 840000 mined</title>
      <link>https://example.org/articles/840000</link>
      <description>The halving block.</description>
      <author>satoshi</author>
      <pubDate>Mon, 12 Feb 2024 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Difficulty retarget</title>
      <link>https://example.org/articles/retarget</link>
      <description>Up three percent.</description>
      <pubDate>Tue, 13 Feb 2024 09:30:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

fn fetcher(max_concurrent: usize) -> FeedFetcher {
    FeedFetcher::new(max_concurrent, 5, "pulsefeed-test/0.1").expect("client builds")
}

async fn mount_feed(server: &MockServer, body: &str) -> String {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/rss+xml"))
        .mount(server)
        .await;
    format!("{}/feed.xml", server.uri())
}

#[tokio::test]
async fn fetches_and_parses_a_feed_document() {
    let server = MockServer::start().await;
    let url = mount_feed(&server, RSS_TWO_ITEMS).await;

    let fetched = fetcher(10).fetch(&url).await.expect("fetch succeeds");

    assert_eq!(fetched.title.as_deref(), Some("Chain Pulse"));
    assert_eq!(
        fetched.description.as_deref(),
        Some("Block-by-block coverage")
    );
    assert_eq!(fetched.entries.len(), 2);

    let first = &fetched.entries[0];
    assert_eq!(first.title.as_deref(), Some("Block 840000 mined"));
    assert_eq!(
        first.link.as_deref(),
        Some("https://example.org/articles/840000")
    );
    assert_eq!(first.summary.as_deref(), Some("The halving block."));
    assert_eq!(
        first.published,
        Some(FeedTimestamp {
            year: 2024,
            month: 2,
            day: 12,
            hour: 12,
            minute: 0,
            second: 0,
        })
    );
}

#[tokio::test]
async fn non_success_status_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = fetcher(10)
        .fetch(&format!("{}/feed.xml", server.uri()))
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn malformed_document_yields_none() {
    let server = MockServer::start().await;
    let url = mount_feed(&server, "this is not a feed document").await;

    assert!(fetcher(10).fetch(&url).await.is_none());
}

#[tokio::test]
async fn unreachable_host_yields_none() {
    // Nothing listens here; the connection is refused immediately.
    let result = fetcher(10).fetch("http://127.0.0.1:1/feed.xml").await;
    assert!(result.is_none());
}

#[tokio::test]
async fn permits_are_restored_after_success_and_failure() {
    let server = MockServer::start().await;
    let url = mount_feed(&server, RSS_TWO_ITEMS).await;

    let fetcher = fetcher(2);
    assert_eq!(fetcher.available_permits(), 2);

    fetcher.fetch(&url).await.expect("fetch succeeds");
    assert_eq!(fetcher.available_permits(), 2);

    fetcher.fetch("http://127.0.0.1:1/feed.xml").await;
    assert_eq!(fetcher.available_permits(), 2, "failure also releases");
}

#[tokio::test]
async fn concurrent_downloads_are_capped_by_the_limiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(RSS_TWO_ITEMS, "application/rss+xml")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let url = format!("{}/feed.xml", server.uri());

    let fetcher = Arc::new(fetcher(1));
    let in_flight = {
        let fetcher = Arc::clone(&fetcher);
        let url = url.clone();
        tokio::spawn(async move { fetcher.fetch(&url).await })
    };

    // Give the background fetch time to take the only permit.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        fetcher.available_permits(),
        0,
        "the single slot is held for the whole download"
    );

    let fetched = in_flight.await.expect("task completes");
    assert!(fetched.is_some());
    assert_eq!(fetcher.available_permits(), 1);
}
