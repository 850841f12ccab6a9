mod common;

use common::{article, init_tracing};
use newsletter_aggregator::{chunk, dedupe, sort_newest_first, Article};

fn titles(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.title.as_str()).collect()
}

#[test]
fn test_dedupe_keeps_first_occurrence() {
    init_tracing();
    let mut later = article("Alpha", "2025-01-02T00:00:00+00:00");
    later.source = "Second Source".to_string();

    let articles = vec![
        article("Alpha", "2025-01-01T00:00:00+00:00"),
        article("Beta", ""),
        later,
        article("alpha", ""),
        article("Gamma", ""),
        article("Beta", ""),
    ];

    let unique = dedupe(articles);
    assert_eq!(titles(&unique), vec!["Alpha", "Beta", "alpha", "Gamma"]);
    assert_eq!(unique[0].source, "Example News");
    assert_eq!(unique[0].published_at, "2025-01-01T00:00:00+00:00");
}

#[test]
fn test_dedupe_is_idempotent() {
    let articles: Vec<Article> = ["A", "B", "A", "C", "B", "D"]
        .iter()
        .map(|t| article(t, ""))
        .collect();

    let once = dedupe(articles);
    let twice = dedupe(once.clone());
    assert_eq!(once, twice);
    assert_eq!(dedupe(Vec::new()), Vec::<Article>::new());
}

#[test]
fn test_chunk_covers_list_in_order() {
    let articles: Vec<Article> = (0..25).map(|i| article(&format!("Story {}", i), "")).collect();

    let chunks: Vec<&[Article]> = chunk(&articles, 20).collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 20);
    assert_eq!(chunks[1].len(), 5);

    let rejoined: Vec<Article> = chunks.concat();
    assert_eq!(rejoined, articles);

    // Restartable: a second pass yields the same chunks
    assert_eq!(chunk(&articles, 20).count(), 2);
    assert_eq!(chunk(&articles, 25).count(), 1);
    assert_eq!(chunk(&articles, 7).map(|c| c.len()).collect::<Vec<_>>(), vec![7, 7, 7, 4]);
}

#[test]
fn test_chunk_edge_sizes() {
    let articles: Vec<Article> = (0..3).map(|i| article(&format!("Story {}", i), "")).collect();

    assert_eq!(chunk(&articles, 0).count(), 3);
    assert_eq!(chunk(&[], 20).count(), 0);
}

#[test]
fn test_sort_newest_first_puts_undated_last() {
    let mut articles = vec![
        article("Undated one", ""),
        article("Oldest", "2025-01-01T09:00:00+00:00"),
        article("Newest", "2025-01-03T09:00:00+00:00"),
        article("Undated two", ""),
        // 2025-01-02T20:00 UTC, later than the plain 2025-01-02T12:00 below
        article("Offset", "2025-01-02T15:00:00-05:00"),
        article("Middle", "2025-01-02T12:00:00+00:00"),
    ];

    sort_newest_first(&mut articles);
    assert_eq!(
        titles(&articles),
        vec!["Newest", "Offset", "Middle", "Oldest", "Undated one", "Undated two"]
    );
}

#[test]
fn test_sort_newest_first_treats_invalid_dates_as_undated() {
    let mut articles = vec![
        article("Early", "2025-01-16T01:00:00+00:00"),
        article("Garbled", "2025-01-15X"),
        // 2025-01-16T04:00 UTC
        article("Late", "2025-01-15T23:00:00-05:00"),
    ];

    sort_newest_first(&mut articles);
    assert_eq!(titles(&articles), vec!["Late", "Early", "Garbled"]);
}
