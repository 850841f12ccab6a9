mod common;

use common::{article, init_tracing, numbered_records, selection_reply, StaticSource};
use newsletter_aggregator::policy::default_priority_companies;
use newsletter_aggregator::{
    AggregationPipeline, BatchReducer, Curator, CuratorError, MockCompletion, NewsletterComposer,
    ReducerConfig, Result, TopicPolicy,
};
use std::sync::Arc;

#[tokio::test]
async fn test_compose_orders_newest_first() -> Result<()> {
    init_tracing();
    let mock = Arc::new(MockCompletion::new("writer").with_reply("Subject: Today in education"));
    let composer = NewsletterComposer::new(mock.clone(), TopicPolicy::education());

    let articles = vec![
        article("Older story", "2025-01-10T08:00:00+00:00"),
        article("Undated story", ""),
        article("Newer story", "2025-01-14T08:00:00+00:00"),
    ];
    let priority = vec!["Coursera".to_string(), "Duolingo".to_string()];

    let newsletter = composer.compose(&articles, &priority).await?;
    assert_eq!(newsletter.text, "Subject: Today in education");
    let titles: Vec<&str> = newsletter.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer story", "Older story", "Undated story"]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let prompt = requests[0].last_user_message().unwrap_or_default();
    assert!(prompt.contains("Coursera, Duolingo"));
    assert!(prompt.contains("Pre-K–12"));
    assert!(prompt.contains("education edition"));
    let newer = prompt.find("Title: Newer story").unwrap();
    let older = prompt.find("Title: Older story").unwrap();
    assert!(newer < older);
    Ok(())
}

#[test]
fn test_compose_rejects_empty_list() {
    let mock = Arc::new(MockCompletion::new("writer").with_fallback("unused"));
    let composer = NewsletterComposer::new(mock.clone(), TopicPolicy::general());

    let result = tokio_test::block_on(composer.compose(&[], &default_priority_companies()));
    assert!(matches!(result, Err(CuratorError::EmptyResult)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_curator_skips_newsletter_without_articles() -> Result<()> {
    let reducer_mock = Arc::new(MockCompletion::new("reducer"));
    let writer_mock = Arc::new(MockCompletion::new("writer").with_fallback("unused"));
    let reducer = Arc::new(BatchReducer::new(reducer_mock.clone(), ReducerConfig::default()));

    let pipeline = AggregationPipeline::builder(TopicPolicy::general(), reducer)
        .source(Arc::new(StaticSource::new("empty", Vec::new())))
        .build()?;
    let curator = Curator::new(pipeline, default_priority_companies())
        .with_composer(NewsletterComposer::new(writer_mock.clone(), TopicPolicy::general()));

    let outcome = curator.run(&["Coursera".to_string()]).await?;
    assert!(outcome.articles.is_empty());
    assert!(outcome.newsletter.is_none());
    assert_eq!(reducer_mock.request_count(), 0);
    assert_eq!(writer_mock.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_curator_runs_pipeline_then_composer() -> Result<()> {
    init_tracing();
    let completion = Arc::new(
        MockCompletion::new("shared")
            .with_reply(selection_reply(["A story 1", "A story 2"]))
            .with_reply("Subject: Weekly roundup"),
    );
    let reducer = Arc::new(BatchReducer::new(completion.clone(), ReducerConfig::default()));

    let pipeline = AggregationPipeline::builder(TopicPolicy::general(), reducer)
        .source(Arc::new(StaticSource::new("source", numbered_records("A", 0..4))))
        .build()?;
    let curator = Curator::new(pipeline, vec!["Coursera".to_string()])
        .with_composer(NewsletterComposer::new(completion.clone(), TopicPolicy::general()));

    let outcome = curator.run(&["Coursera".to_string()]).await?;
    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(outcome.report.curated_articles, 2);
    let newsletter = outcome.newsletter.unwrap();
    assert_eq!(newsletter.text, "Subject: Weekly roundup");
    assert_eq!(newsletter.articles.len(), 2);
    assert_eq!(completion.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_curator_without_composer_returns_articles_only() -> Result<()> {
    let completion = Arc::new(MockCompletion::new("reducer").with_reply(selection_reply(["A story 0"])));
    let reducer = Arc::new(BatchReducer::new(completion.clone(), ReducerConfig::default()));
    let pipeline = AggregationPipeline::builder(TopicPolicy::general(), reducer)
        .source(Arc::new(StaticSource::new("source", numbered_records("A", 0..2))))
        .build()?;

    let outcome = Curator::new(pipeline, Vec::new()).run(&["Coursera".to_string()]).await?;
    assert_eq!(outcome.articles.len(), 1);
    assert!(outcome.newsletter.is_none());
    assert_eq!(completion.request_count(), 1);
    Ok(())
}
