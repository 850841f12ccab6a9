use crate::types::Article;
use chrono::DateTime;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};

/// Drop articles whose title has already been seen. First occurrence wins
/// and relative order is preserved.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let total = articles.len();
    let mut seen_titles = HashSet::with_capacity(total);
    let mut unique_articles = Vec::with_capacity(total);

    for article in articles {
        if seen_titles.contains(&article.title) {
            debug!("Removing duplicate article: {} ({})", article.title, article.url);
            continue;
        }
        seen_titles.insert(article.title.clone());
        unique_articles.push(article);
    }

    let removed_count = total - unique_articles.len();
    if removed_count > 0 {
        info!("Removed {} duplicate articles", removed_count);
    }

    unique_articles
}

/// Contiguous slices of at most `size` articles, in order. A size of zero is
/// treated as one.
pub fn chunk(articles: &[Article], size: usize) -> std::slice::Chunks<'_, Article> {
    articles.chunks(size.max(1))
}

/// Sort newest first by `published_at`. Articles without a valid RFC 3339
/// date go last, keeping their relative order.
pub fn sort_newest_first(articles: &mut [Article]) {
    let timestamp = |article: &Article| DateTime::parse_from_rfc3339(&article.published_at).ok();
    articles.sort_by(|a, b| match (timestamp(a), timestamp(b)) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(&a_ts),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
