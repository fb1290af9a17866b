//! Search provider adapter. Normalizes calls to the literature search API
//! into a uniform request/response shape. Performs no retries; retry policy
//! belongs to callers (none is applied — a failed sub-query is skipped).

use crate::config::ProviderConfig;
use crate::model::{ArticleRecord, SearchFilters, SortMode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential rejected. Surfaced distinctly so callers can trigger
    /// re-authentication instead of a generic retry.
    #[error("search provider rejected the credential")]
    Auth,
    #[error("search provider error: HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("search provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: SortMode,
    pub limit: usize,
}

impl SearchQuery {
    pub fn plain(query: impl Into<String>, limit: usize) -> Self {
        Self { query: query.into(), filters: SearchFilters::default(), sort: SortMode::Relevance, limit }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub results: Vec<ArticleRecord>,
}

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base: String,
    max_limit: usize,
}

impl ProviderClient {
    pub fn new(cfg: &ProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("paperscout/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .expect("reqwest client");
        Self { http, base: cfg.base.trim_end_matches('/').to_string(), max_limit: cfg.max_limit }
    }

    pub async fn search(&self, q: &SearchQuery, token: &str) -> Result<SearchResponse, ProviderError> {
        let limit = q.limit.clamp(1, self.max_limit);
        let sort = match q.sort {
            SortMode::Relevance => "relevance",
            SortMode::Recent => "recent",
        };
        let mut req = self
            .http
            .get(format!("{}/search", self.base))
            .bearer_auth(token)
            .query(&[("q", q.query.as_str()), ("sort", sort)])
            .query(&[("limit", limit)]);
        if let Some(field) = q.filters.field.as_deref() {
            req = req.query(&[("field", field)]);
        }
        if let Some(from) = q.filters.date_from.as_deref() {
            req = req.query(&[("from", from)]);
        }
        if !q.filters.article_types.is_empty() {
            req = req.query(&[("types", q.filters.article_types.join(",").as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            scout_telemetry::inc_provider_search("auth");
            return Err(ProviderError::Auth);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body = truncate(&body, 400);
            scout_telemetry::inc_provider_search("error");
            return Err(ProviderError::Http { status: status.as_u16(), body });
        }
        let parsed: SearchResponse = resp.json().await?;
        scout_telemetry::inc_provider_search("ok");
        Ok(parsed)
    }
}

fn truncate(s: &str, max: usize) -> String {
    let t = s.trim();
    if t.chars().count() <= max {
        t.to_string()
    } else {
        let cut: String = t.chars().take(max).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_error_bodies() {
        let long = "x".repeat(500);
        let t = truncate(&long, 400);
        assert!(t.chars().count() <= 401);
        assert!(t.ends_with('…'));
    }

    #[test]
    fn plain_query_defaults() {
        let q = SearchQuery::plain("dark matter", 10);
        assert_eq!(q.sort, SortMode::Relevance);
        assert!(q.filters.field.is_none());
    }
}
