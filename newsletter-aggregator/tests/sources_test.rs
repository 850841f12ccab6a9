mod common;

use common::init_tracing;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use newsletter_aggregator::sources::serper::SerperSource;
use newsletter_aggregator::{
    CuratorError, FeedParser, FetchConfig, Fetcher, FetchOptions, NewsFeedSource, Normalizer, Recency,
    RelevanceFilter, SourceAdapter, SourceKind,
};

const GOOGLE_NEWS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"Coursera" - Google News</title>
    <link>https://news.google.com/search?q=Coursera</link>
    <description>Google News</description>
    <item>
      <title>Coursera adds AI courses for teachers - EdSurge</title>
      <link>https://news.google.com/articles/abc</link>
      <guid isPermaLink="false">abc</guid>
      <pubDate>Wed, 15 Jan 2025 08:30:00 GMT</pubDate>
      <description>&lt;a href="https://edsurge.example"&gt;Coursera adds AI courses&lt;/a&gt;</description>
    </item>
    <item>
      <title>Untagged headline</title>
      <link>https://news.google.com/articles/def</link>
      <guid isPermaLink="false">def</guid>
      <pubDate>Tue, 14 Jan 2025 18:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

#[test]
fn test_feed_parser_builds_rss_records() {
    init_tracing();
    assert!(FeedParser::is_valid_feed_content(GOOGLE_NEWS_SAMPLE));

    let records = FeedParser::parse_records(GOOGLE_NEWS_SAMPLE).unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first["title"], "Coursera adds AI courses for teachers");
    assert_eq!(first["source"], "EdSurge");
    assert_eq!(first["link"], "https://news.google.com/articles/abc");
    assert_eq!(first["pubDate"], "2025-01-15T08:30:00+00:00");

    // Without a publisher suffix the feed title stands in
    assert_eq!(records[1]["title"], "Untagged headline");
    assert_eq!(records[1]["source"], "\"Coursera\" - Google News");

    let normalizer = Normalizer::new(RelevanceFilter::AcceptAll);
    let article = normalizer.normalize(first, SourceKind::NewsFeed).unwrap();
    assert_eq!(article.description, "Coursera adds AI courses");
    assert_eq!(article.published_at, "2025-01-15T08:30:00+00:00");
    assert_eq!(article.source, "EdSurge");
}

#[test]
fn test_feed_parser_rejects_garbage() {
    assert!(!FeedParser::is_valid_feed_content("<html><body>Not a feed</body></html>"));
    assert!(matches!(
        FeedParser::parse_records("definitely not xml"),
        Err(CuratorError::Parse(_))
    ));
}

#[test]
fn test_serper_request_body() {
    let options = FetchOptions {
        recency: Recency::PastWeek,
        max_results: 50,
        ..FetchOptions::default()
    };
    let body = SerperSource::request_body("+education \"Coursera\"", &options);

    assert_eq!(body["q"], "+education \"Coursera\"");
    assert_eq!(body["location"], "United States");
    assert_eq!(body["gl"], "us");
    assert_eq!(body["hl"], "en");
    assert_eq!(body["num"], 50);
    assert_eq!(body["tbs"], "qdr:w");
}

#[test]
fn test_serper_requires_api_key() {
    let result = SerperSource::new("  ", FetchConfig::default());
    assert!(matches!(result, Err(CuratorError::Config(_))));

    let source = SerperSource::new("key", FetchConfig::default()).unwrap();
    assert_eq!(source.kind(), SourceKind::Serper);
}

#[test]
fn test_news_feed_search_url() {
    let source = NewsFeedSource::new(FetchConfig::default()).unwrap();
    let url = source.search_url("Coursera", &FetchOptions::default()).unwrap();

    assert_eq!(url.host_str(), Some("news.google.com"));
    assert_eq!(url.path(), "/rss/search");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("q".to_string(), "Coursera when:1d".to_string()),
            ("hl".to_string(), "en-US".to_string()),
            ("gl".to_string(), "US".to_string()),
            ("ceid".to_string(), "US:en".to_string()),
        ]
    );
    assert_eq!(source.kind(), SourceKind::NewsFeed);
}

#[tokio::test]
async fn test_unreachable_feed_is_source_unavailable() {
    let config = FetchConfig {
        timeout_seconds: 2,
        max_retries: 0,
        ..FetchConfig::default()
    };
    let source = NewsFeedSource::new(config)
        .unwrap()
        .with_base_url("http://127.0.0.1:9/rss/search");

    let result = source.fetch("Coursera", &FetchOptions::default()).await;
    assert!(matches!(result, Err(CuratorError::SourceUnavailable { .. })));
}

/// Serve one chunked response of `chunks` 64 KiB chunks with no
/// Content-Length, then close.
async fn serve_chunked(chunks: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let data = vec![b'a'; 64 * 1024];
        for _ in 0..chunks {
            let size = format!("{:x}\r\n", data.len());
            let frame = [size.as_bytes(), &data[..], &b"\r\n"[..]].concat();
            if socket.write_all(&frame).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    format!("http://{}/feed", addr)
}

#[tokio::test]
async fn test_chunked_body_respects_size_limit() -> newsletter_aggregator::Result<()> {
    init_tracing();
    let config = FetchConfig {
        max_response_size_mb: 1,
        max_retries: 0,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(config)?;

    let small = serve_chunked(4).await;
    let body = fetcher.get_text(&small).await?;
    assert_eq!(body.len(), 4 * 64 * 1024);

    let large = serve_chunked(20).await;
    match fetcher.get_text(&large).await {
        Err(CuratorError::General(message)) => assert!(message.contains("exceeds 1MB"), "{}", message),
        other => panic!("expected a size error, got {:?}", other.map(|b| b.len())),
    }
    Ok(())
}
