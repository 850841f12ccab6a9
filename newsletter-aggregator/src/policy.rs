//! Topic policies: which queries to run, which records count as relevant, and
//! how the model should select from each batch.
//!
//! A policy is picked once, when the pipeline is built, and passed down
//! explicitly. The keyword lists below are only defaults for those policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const DEFAULT_PRIORITY_COMPANIES: &[&str] = &[
    "Amira Learning",
    "Barclays",
    "Bertelsmann",
    "Boston Consulting Group",
    "Bright Horizons",
    "Cengage",
    "Chan Zuckerberg Initiative",
    "Chegg",
    "CompTIA",
    "Course Hero",
    "Coursera",
    "Duolingo",
    "Edmentum",
    "Education Week",
    "Emeritus",
    "Explorance",
    "Frontline Education",
    "Goldman Sachs",
    "Google Cloud",
    "Handshake",
    "JFF",
    "Kaplan",
    "Macquarie Capital",
    "McGraw Hill",
    "McKinsey",
    "Microsoft",
    "Morgan Stanley",
    "Pearson",
    "Prosus",
    "Renaissance",
    "Scholastic Corporation",
    "Skillsoft",
    "The Princeton Review/Tutor.com",
    "Walton Family Foundation",
    "WGU",
    "Wiley",
    "William Blair",
    "Zoom",
];

pub const EDUCATION_TERMS: &[&str] = &[
    "education", "learning", "teaching", "pedagogy", "curriculum", "school", "classroom",
    "student", "teacher", "university", "college", "assessment", "skill", "literacy",
    "stem", "academic", "training", "instruction", "educator", "higher education",
    "k-12", "early childhood", "vocational", "e-learning", "online learning", "tutoring",
    "homework", "syllabus", "scholarship", "degree", "diploma", "enrollment", "graduation",
    "course", "lesson", "lecture", "exam", "educational technology",
    "classroom management", "education policy", "academic research", "edtech", "ed-tech",
    "ed tech",
];

pub const FINANCE_KEYWORDS: &[&str] = &[
    "valuation", "financing", "funding", "capital", "raise", "investment", "ipo",
    "seed round", "series a", "series b", "series c", "venture", "equity", "debt",
    "acquisition", "merger", "fundraise",
];

const TRUSTED_FINANCE_SOURCES: &[&str] = &[
    "Reuters",
    "Bloomberg",
    "The Wall Street Journal",
    "Financial Times",
    "TechCrunch",
    "EdSurge",
    "Axios",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Education,
    Finance,
    General,
}

impl Topic {
    pub fn label(&self) -> &'static str {
        match self {
            Topic::Education => "education",
            Topic::Finance => "finance",
            Topic::General => "general",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "education" | "edu" => Ok(Topic::Education),
            "finance" | "funding" => Ok(Topic::Finance),
            "general" | "all" => Ok(Topic::General),
            other => Err(format!("unknown topic '{}' (expected education, finance or general)", other)),
        }
    }
}

/// Keyword predicate applied to every normalized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceFilter {
    /// Keep a record when at least one term occurs in its title or
    /// description. Terms are matched as lowercase substrings.
    Terms(Vec<String>),
    AcceptAll,
}

impl RelevanceFilter {
    pub fn terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RelevanceFilter::Terms(terms.into_iter().map(|t| t.as_ref().to_lowercase()).collect())
    }

    pub fn is_relevant(&self, title: &str, description: &str) -> bool {
        match self {
            RelevanceFilter::AcceptAll => true,
            RelevanceFilter::Terms(terms) => {
                let text = format!("{} {}", title, description).to_lowercase();
                terms.iter().any(|term| text.contains(term.as_str()))
            }
        }
    }
}

/// How the model is asked to shape its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Plain reply that must parse as a JSON array.
    FreeText,
    /// Reply constrained by a JSON schema wrapping the array in `articles`.
    JsonSchema,
}

/// Rules handed to the model for one batch.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub system_role: String,
    pub audience: String,
    pub count: RangeInclusive<usize>,
    pub inclusion_rules: Vec<String>,
    pub exclusion_rules: Vec<String>,
    pub geography: Option<String>,
    pub must_include_sources: Vec<String>,
    pub response_mode: ResponseMode,
}

impl SelectionPolicy {
    /// "8-15", or "exactly 10" for a single-value range.
    pub fn count_phrase(&self) -> String {
        if self.count.start() == self.count.end() {
            format!("exactly {}", self.count.start())
        } else {
            format!("{}-{}", self.count.start(), self.count.end())
        }
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        self.count.contains(&count)
    }

    /// Bulleted criteria list for the selection prompt.
    pub fn rules_text(&self) -> String {
        let mut rules: Vec<String> = self.inclusion_rules.clone();
        if let Some(geography) = &self.geography {
            rules.push(geography.clone());
        }
        rules.extend(self.exclusion_rules.iter().cloned());
        if !self.must_include_sources.is_empty() {
            rules.push(format!(
                "Always include qualifying articles from these trusted sources: {}.",
                self.must_include_sources.join(", ")
            ));
        }
        rules.push(
            "Exclude duplicate articles; if more than one article has the same title, select the one with the more credible source."
                .to_string(),
        );

        rules
            .iter()
            .map(|rule| format!("- {}", rule))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything that differs between newsletter topics.
#[derive(Debug, Clone)]
pub struct TopicPolicy {
    pub topic: Topic,
    /// Query template; `{keyword}` is replaced with each topic keyword.
    pub query_template: String,
    /// Queries issued once per run regardless of the keyword list.
    pub standalone_queries: Vec<String>,
    pub relevance: RelevanceFilter,
    pub selection: SelectionPolicy,
    pub newsletter_sections: Vec<String>,
}

impl TopicPolicy {
    pub fn for_topic(topic: Topic) -> Self {
        match topic {
            Topic::Education => Self::education(),
            Topic::Finance => Self::finance(),
            Topic::General => Self::general(),
        }
    }

    pub fn education() -> Self {
        Self {
            topic: Topic::Education,
            query_template: "+education \"{keyword}\"".to_string(),
            standalone_queries: vec!["\"education\"".to_string()],
            relevance: RelevanceFilter::terms(EDUCATION_TERMS),
            selection: SelectionPolicy {
                system_role: "You are an AI assistant that filters and prioritizes education-related news articles"
                    .to_string(),
                audience: "an education-focused venture capital firm's newsletter".to_string(),
                count: 8..=15,
                inclusion_rules: vec![
                    "Primarily cover education news.".to_string(),
                    "Are important or broadly newsworthy.".to_string(),
                ],
                exclusion_rules: vec![
                    "Exclude articles containing extremely negative or sensitive content (e.g., school shootings)."
                        .to_string(),
                    "Exclude articles that do not indicate a significant development or trend in education."
                        .to_string(),
                ],
                geography: Some(
                    "Reflect U.S. or global trends (avoid highly localized or niche events).".to_string(),
                ),
                must_include_sources: Vec::new(),
                response_mode: ResponseMode::FreeText,
            },
            newsletter_sections: vec![
                "AI".to_string(),
                "Pre-K–12".to_string(),
                "Workforce Learning & Skills".to_string(),
                "Higher Ed & HireEd".to_string(),
            ],
        }
    }

    pub fn finance() -> Self {
        Self {
            topic: Topic::Finance,
            query_template: "\"{keyword}\" (funding OR investment OR acquisition)".to_string(),
            standalone_queries: vec!["edtech funding".to_string()],
            relevance: RelevanceFilter::terms(FINANCE_KEYWORDS),
            selection: SelectionPolicy {
                system_role: "You are an AI assistant that filters and prioritizes funding and deal news for venture investors"
                    .to_string(),
                audience: "an education-focused venture capital firm's deal roundup".to_string(),
                count: 8..=12,
                inclusion_rules: vec![
                    "Report a concrete financing event: funding round, acquisition, merger, IPO or valuation change."
                        .to_string(),
                    "Involve companies or investors relevant to education, workforce learning or adjacent technology."
                        .to_string(),
                ],
                exclusion_rules: vec![
                    "Exclude articles containing extremely negative or sensitive content.".to_string(),
                    "Exclude market commentary and stock-price recaps without a specific deal.".to_string(),
                ],
                geography: Some(
                    "Prefer U.S.-based companies and investors; exclude deals only involving companies headquartered outside the U.S. unless globally significant."
                        .to_string(),
                ),
                must_include_sources: TRUSTED_FINANCE_SOURCES.iter().map(|s| s.to_string()).collect(),
                response_mode: ResponseMode::JsonSchema,
            },
            newsletter_sections: vec![
                "Funding Rounds".to_string(),
                "M&A".to_string(),
                "Public Markets".to_string(),
            ],
        }
    }

    pub fn general() -> Self {
        Self {
            topic: Topic::General,
            query_template: "\"{keyword}\"".to_string(),
            standalone_queries: Vec::new(),
            relevance: RelevanceFilter::AcceptAll,
            selection: SelectionPolicy {
                system_role: "You are an AI assistant that filters and prioritizes company news".to_string(),
                audience: "a venture capital firm's portfolio news digest".to_string(),
                count: 10..=10,
                inclusion_rules: vec!["Are important or broadly newsworthy.".to_string()],
                exclusion_rules: vec![
                    "Exclude articles containing extremely negative or sensitive content.".to_string(),
                ],
                geography: None,
                must_include_sources: Vec::new(),
                response_mode: ResponseMode::FreeText,
            },
            newsletter_sections: vec![
                "Company News".to_string(),
                "Industry".to_string(),
                "Other".to_string(),
            ],
        }
    }

    /// One query per keyword, followed by the standalone queries.
    pub fn queries(&self, keywords: &[String]) -> Vec<String> {
        keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(|keyword| self.query_template.replace("{keyword}", keyword))
            .chain(self.standalone_queries.iter().cloned())
            .collect()
    }
}

/// Split a comma-separated keyword list, dropping blanks.
pub fn parse_keyword_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .collect()
}

pub fn default_priority_companies() -> Vec<String> {
    DEFAULT_PRIORITY_COMPANIES.iter().map(|c| c.to_string()).collect()
}
