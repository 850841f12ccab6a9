use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use newsletter_aggregator::policy::{default_priority_companies, parse_keyword_list};
use newsletter_aggregator::{
    AggregationPipeline, BatchReducer, CompletionService, Curator, CuratorConfig, MockCompletion,
    NewsFeedSource, NewsletterComposer, OpenAiCompletion, SerperSource, SourceAdapter, Topic,
    TopicPolicy,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceChoice {
    Serper,
    NewsFeed,
}

/// Curate recent news for a topic and write a newsletter from it.
#[derive(Debug, Parser)]
#[command(name = "newsletter", version)]
struct Cli {
    #[arg(long, default_value = "education")]
    topic: Topic,

    /// Comma-separated keywords; defaults to the priority company list
    #[arg(long)]
    keywords: Option<String>,

    /// Sources to query; defaults to every source that is configured
    #[arg(long, value_enum, value_delimiter = ',')]
    sources: Vec<SourceChoice>,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the curated articles and skip the newsletter
    #[arg(long)]
    articles_only: bool,

    #[arg(long)]
    json: bool,

    /// Offline run: no sources, scripted completions
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CuratorConfig::from_env().context("invalid environment configuration")?;
    if let Some(chunk_size) = cli.chunk_size {
        config.pipeline.chunk_size = chunk_size;
    }
    if let Some(concurrency) = cli.concurrency {
        config.pipeline.max_concurrency = concurrency;
    }

    let priority = default_priority_companies();
    let keywords = match &cli.keywords {
        Some(list) => parse_keyword_list(list),
        None => priority.clone(),
    };
    if keywords.is_empty() {
        bail!("no keywords given");
    }

    let policy = TopicPolicy::for_topic(cli.topic);
    let completion: Arc<dyn CompletionService> = if cli.dry_run {
        Arc::new(MockCompletion::new("dry run").with_fallback("[]"))
    } else {
        Arc::new(OpenAiCompletion::new(config.completion.clone()).context("set OPENAI_API_KEY")?)
    };

    let sources = if cli.dry_run {
        for query in policy.queries(&keywords) {
            info!("Dry run, would search: {}", query);
        }
        Vec::new()
    } else {
        build_sources(&cli.sources, &config)?
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            ctrl_c.cancel();
        }
    });

    let reducer = Arc::new(BatchReducer::new(Arc::clone(&completion), config.reducer.clone()));
    let pipeline = AggregationPipeline::builder(policy.clone(), reducer)
        .sources(sources)
        .config(config.pipeline.clone())
        .cancellation(cancel)
        .build()?;

    let mut curator = Curator::new(pipeline, priority);
    if !cli.articles_only {
        curator = curator.with_composer(NewsletterComposer::new(completion, policy));
    }

    let outcome = curator.run(&keywords).await?;

    if cli.json {
        let output = json!({
            "articles": outcome.articles,
            "newsletter": outcome.newsletter,
            "report": outcome.report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if outcome.articles.is_empty() {
        println!("No articles found for {}.", cli.topic);
        return Ok(());
    }

    for article in &outcome.articles {
        println!("[{}]({}) - {}", article.title, article.url, article.published_at);
    }
    if let Some(newsletter) = outcome.newsletter {
        println!("\n{}", newsletter.text);
    }

    Ok(())
}

fn build_sources(choices: &[SourceChoice], config: &CuratorConfig) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let choices = if choices.is_empty() {
        let mut defaults = vec![SourceChoice::NewsFeed];
        if config.serper_api_key.is_some() {
            defaults.insert(0, SourceChoice::Serper);
        }
        defaults
    } else {
        choices.to_vec()
    };

    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for choice in choices {
        match choice {
            SourceChoice::Serper => {
                let Some(api_key) = config.serper_api_key.clone() else {
                    bail!("the serper source needs SERPER_API_KEY");
                };
                sources.push(Arc::new(SerperSource::new(api_key, config.fetch.clone())?));
            }
            SourceChoice::NewsFeed => {
                sources.push(Arc::new(NewsFeedSource::new(config.fetch.clone())?));
            }
        }
    }
    Ok(sources)
}
