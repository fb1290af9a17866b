use serde::{Deserialize, Serialize};

/// One literature item as returned by the search provider. Immutable once
/// returned; the summarizer attaches `summary` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub pages: Option<String>,
    /// DOI-like identifier; the global dedup key. Records without one are
    /// excluded from keyed aggregation.
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub citations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ArticleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub summary: String,
    pub ai_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_title: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Explainer,
    Survey,
    Specific,
    Author,
    Comparative,
}

impl Intent {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "explainer" => Some(Intent::Explainer),
            "survey" => Some(Intent::Survey),
            "specific" => Some(Intent::Specific),
            "author" => Some(Intent::Author),
            "comparative" => Some(Intent::Comparative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Relevance,
    Recent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Restrict matching to one provider field ("title", "author", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Inclusive lower bound, ISO date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub article_types: Vec<String>,
}

pub const SUBQUERY_WEIGHT_MIN: f64 = 0.5;
pub const SUBQUERY_WEIGHT_MAX: f64 = 2.5;

/// One weighted, purpose-labeled search issued as part of a plan.
/// Consumed exactly once by the provider adapter, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuery {
    pub query: String,
    pub purpose: String,
    pub weight: f64,
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SubQuery {
    pub fn new(query: impl Into<String>, purpose: impl Into<String>, weight: f64) -> Self {
        Self {
            query: query.into(),
            purpose: purpose.into(),
            weight: weight.clamp(SUBQUERY_WEIGHT_MIN, SUBQUERY_WEIGHT_MAX),
            filters: SearchFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Produced once per request by whichever planner is active; read-only after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlan {
    pub interpretation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub concepts: Vec<String>,
    pub searches: Vec<SubQuery>,
}

/// Append-only log entry from the agentic planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AgentStep {
    #[serde(rename_all = "camelCase")]
    Search { iteration: usize, query: String, search_type: String, found: usize, new: usize },
    #[serde(rename_all = "camelCase")]
    Analysis { iteration: usize, coverage: String, gaps: Vec<String>, suggestions: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Finish { iteration: usize, reasoning: String, coverage_summary: String },
    #[serde(rename_all = "camelCase")]
    Thinking { iteration: usize, text: String },
    #[serde(rename_all = "camelCase")]
    Error { iteration: usize, message: String },
    #[serde(rename_all = "camelCase")]
    MaxIterations { iteration: usize },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub papers: Vec<ArticleRecord>,
    /// First query that surfaced each paper, parallel to `papers`.
    pub origins: Vec<String>,
    pub steps: Vec<AgentStep>,
    pub finish_reason: String,
    pub total_searches: usize,
}

/// One ranked output row: the article plus derived ranking metadata.
/// Invariant: `overlap == sources.len() >= 1`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    #[serde(flatten)]
    pub article: ArticleRecord,
    pub sources: Vec<String>,
    pub overlap: usize,
    pub weight: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingStats {
    pub unique_papers: usize,
    /// Entries returned by more than one sub-query.
    pub multi_source: usize,
    /// Entries returned by three or more sub-queries.
    pub strong_overlap: usize,
    pub max_overlap: usize,
}
