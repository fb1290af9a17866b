use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app::SharedState;
use crate::model::{AgentStep, ArticleRecord, Intent, RankingStats, SortMode, SubQuery};
use crate::pipeline::{self, PipelineRequest};
use crate::provider::{ProviderError, SearchQuery};

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ApiError {
    message: String,
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/api/search", post(plain_search))
        .route("/api/search/ai", post(ai_search))
        .route("/api/summarize", post(summarize))
        .with_state(state)
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    scout_telemetry::inc_api_request("/health");
    Json(Health { status: "ok", version: state.version })
}

async fn ready() -> impl IntoResponse {
    scout_telemetry::inc_api_request("/ready");
    StatusCode::OK
}

async fn metrics() -> impl IntoResponse {
    scout_telemetry::inc_api_request("/metrics");
    let body = scout_telemetry::gather_prometheus();
    ([("Content-Type", "text/plain; version=0.0.4")], body)
}

fn bearer_token(headers: &HeaderMap, state: &SharedState) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .or_else(|| state.config.read().provider.token.clone())
}

fn input_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiError { message: message.into() })).into_response()
}

fn auth_error() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError { message: "search provider credential missing or rejected; please re-authenticate".into() }),
    )
        .into_response()
}

fn provider_failure() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiError { message: "search failed, please try again".into() }),
    )
        .into_response()
}

// --- plain search passthrough ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchReq {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    sort: Option<SortMode>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    article_types: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlainSearchResp {
    total: u64,
    results: Vec<ArticleRecord>,
}

async fn plain_search(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<SearchReq>,
) -> Response {
    scout_telemetry::inc_api_request("/api/search");
    let sanitized = state.handles.sanitizer.sanitize(&req.query);
    if sanitized.is_empty() {
        return input_error("query is required");
    }
    if sanitized.suspicious {
        scout_telemetry::inc_suspicious_query("/api/search");
        warn!("sanitizer removed a large share of the query input");
    }
    let Some(token) = bearer_token(&headers, &state) else {
        return auth_error();
    };
    let q = SearchQuery {
        query: sanitized.text,
        filters: crate::model::SearchFilters {
            field: req.field,
            date_from: req.date_from,
            article_types: req.article_types,
        },
        sort: req.sort.unwrap_or_default(),
        limit: req.limit.unwrap_or(20),
    };
    match state.handles.provider.search(&q, &token).await {
        Ok(resp) => {
            Json(PlainSearchResp { total: resp.total, results: resp.results }).into_response()
        }
        Err(ProviderError::Auth) => auth_error(),
        Err(e) => {
            warn!(error = %e, "plain search failed");
            provider_failure()
        }
    }
}

// --- AI-assisted search ---

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiSearchReq {
    #[serde(default)]
    query: String,
    #[serde(default)]
    agentic: bool,
    #[serde(default = "default_true")]
    synthesize: bool,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AiAnalysis {
    interpretation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<Intent>,
    concepts: Vec<String>,
    searches: Vec<SubQuery>,
    ai_planned: bool,
    suspicious: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    synthesis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_steps: Option<Vec<AgentStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_searches: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AiSearchResp {
    query: String,
    ai_analysis: Option<AiAnalysis>,
    ranking: Option<RankingStats>,
    total: u64,
    results: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<bool>,
}

async fn ai_search(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<AiSearchReq>,
) -> Response {
    scout_telemetry::inc_api_request("/api/search/ai");
    let sanitized = state.handles.sanitizer.sanitize(&req.query);
    if sanitized.is_empty() {
        return input_error("query is required");
    }
    if sanitized.suspicious {
        scout_telemetry::inc_suspicious_query("/api/search/ai");
        warn!("sanitizer removed a large share of the query input");
    }
    let Some(token) = bearer_token(&headers, &state) else {
        return auth_error();
    };

    let pipeline_req = PipelineRequest {
        question: &sanitized.text,
        token: &token,
        agentic: req.agentic,
        synthesize: req.synthesize,
        limit: req.limit,
    };
    match pipeline::run(&state.handles, pipeline_req).await {
        Ok(out) => {
            let results = serde_json::to_value(&out.entries).unwrap_or_default();
            let total = out.stats.unique_papers as u64;
            let analysis = AiAnalysis {
                interpretation: out.interpretation,
                intent: out.intent,
                concepts: out.concepts,
                searches: out.searches,
                ai_planned: out.ai_planned,
                suspicious: sanitized.suspicious,
                synthesis: out.synthesis,
                agent_steps: out.agent.as_ref().map(|a| a.steps.clone()),
                finish_reason: out.agent.as_ref().map(|a| a.finish_reason.clone()),
                total_searches: out.agent.as_ref().map(|a| a.total_searches),
            };
            Json(AiSearchResp {
                query: sanitized.text,
                ai_analysis: Some(analysis),
                ranking: Some(out.stats),
                total,
                results,
                fallback: None,
            })
            .into_response()
        }
        Err(e) => {
            // AI-path total failure: substitute a plain search and label it.
            warn!(error = %e, "ai search flow failed; attempting plain search fallback");
            let q = SearchQuery::plain(sanitized.text.clone(), req.limit.unwrap_or(20));
            match state.handles.provider.search(&q, &token).await {
                Ok(resp) => Json(AiSearchResp {
                    query: sanitized.text,
                    ai_analysis: None,
                    ranking: None,
                    total: resp.total,
                    results: serde_json::to_value(&resp.results).unwrap_or_default(),
                    fallback: Some(true),
                })
                .into_response(),
                Err(ProviderError::Auth) => auth_error(),
                Err(e2) => {
                    warn!(error = %e2, "plain search fallback also failed");
                    provider_failure()
                }
            }
        }
    }
}

// --- per-article summarization ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeReq {
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    search_query: Option<String>,
}

async fn summarize(
    State(state): State<SharedState>,
    Json(req): Json<SummarizeReq>,
) -> Response {
    scout_telemetry::inc_api_request("/api/summarize");
    let has_abstract = req.abstract_text.as_deref().is_some_and(|a| !a.trim().is_empty());
    if req.title.trim().is_empty() && !has_abstract {
        return input_error("title or abstract is required");
    }
    let summary = state
        .handles
        .summarizer
        .summarize(&req.title, req.abstract_text.as_deref(), req.search_query.as_deref())
        .await;
    Json(summary).into_response()
}
