use crate::policy::{SelectionPolicy, TopicPolicy};
use crate::types::Article;

pub const SELECTION_TEMPLATE: &str = r#"Role: {role} for {audience}.
Task:
You are given a list of articles.
Select {count} articles that meet all of the following criteria:
{rules}

Output the chosen articles only as a JSON list of {count} objects with the keys:
"title"
"url"
"description"
"publishedAt"
"source"

Copy each chosen article's fields exactly as given. Do not include anything else in your final output: no explanations, no extra text.

Articles:
{articles}

Output format:
[{"title":"...", "url":"...", "description":"...", "publishedAt":"...", "source":"..."}, ...]"#;

pub const CORRECTIVE_PROMPT: &str = "Your previous output was not valid JSON ({reason}). Resend the same selection strictly as JSON in the required format, with no other text.";

pub const NEWSLETTER_SYSTEM_ROLE: &str = "You are an AI newsletter writer for an education-focused venture fund.";

pub const NEWSLETTER_TEMPLATE: &str = r#"Role: You are an AI newsletter writer for an education-focused venture fund, writing the {topic} edition. Coverage is primarily U.S. news, with limited global highlights if relevant.

Input:
A list of priority companies whose news should be highlighted first.
A batch of articles, newest first.

Focus:
Include only non-sensitive content (exclude events like school shootings or other highly negative items).
Deduplicate articles and prioritize those involving the priority companies or that show significant trends.

Output Format: A visually appealing, professional newsletter with the following structure:
Header
Subject Line: Standard text with today's date ({date}) plus a relevant news teaser.
Preview Text (100-140 characters): Summarize the first three headlines in sentence form to encourage opens.
Breaking News Section (1-2 articles, optional if no urgent developments)
Top Stories Section (exactly 3 articles)
More Stories Section, further divided into subcategories (1-5 articles each, 2-3 is ideal):
{sections}
Within these categories, include any remaining important stories.

Styling:
Keep the text professional, concise, and visually clear.
Link every story to its URL.

Constraints:
Do not include explanatory text or commentary outside the newsletter.
Do not exceed the requested number of articles in each section.

Priority Companies:
{priority}

Articles:
{articles}

Now produce the final newsletter, and nothing else."#;

/// Numbered plain-text rendering of articles, as embedded in prompts.
pub fn render_articles(articles: &[Article]) -> String {
    let mut text = String::new();
    for (i, article) in articles.iter().enumerate() {
        text.push_str(&format!(
            "\nArticle {}:\nTitle: {}\nSummary: {}\nURL: {}\nPublishedAt: {}\nSource: {}\n",
            i + 1,
            article.title,
            article.description,
            article.url,
            article.published_at,
            article.source
        ));
    }
    text
}

/// User prompt for one reducer call.
pub fn selection_prompt(template: &str, policy: &SelectionPolicy, batch: &[Article]) -> String {
    template
        .replace("{role}", &policy.system_role)
        .replace("{audience}", &policy.audience)
        .replace("{count}", &policy.count_phrase())
        .replace("{rules}", &policy.rules_text())
        .replace("{articles}", &render_articles(batch))
}

pub fn corrective_prompt(reason: &str) -> String {
    CORRECTIVE_PROMPT.replace("{reason}", reason)
}

/// User prompt for the newsletter composer.
pub fn newsletter_prompt(
    template: &str,
    topic: &TopicPolicy,
    priority: &[String],
    articles: &[Article],
    date: &str,
) -> String {
    let sections = topic
        .newsletter_sections
        .iter()
        .map(|section| format!("  {}", section))
        .collect::<Vec<_>>()
        .join("\n");

    // Articles go in last so article text cannot inject placeholders
    template
        .replace("{topic}", topic.topic.label())
        .replace("{date}", date)
        .replace("{sections}", &sections)
        .replace("{priority}", &priority.join(", "))
        .replace("{articles}", &render_articles(articles))
}
