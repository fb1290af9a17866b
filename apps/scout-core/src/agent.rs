//! Agentic planner: an iterative controller that lets the LLM choose search
//! calls, gap analyses, and a termination decision, bounded by a maximum
//! iteration count. The full message history is explicit session data (not
//! captured in closures) so each transition is replayable in tests.

use crate::config::AgentConfig;
use crate::llm::{LlmClient, TurnOutcome};
use crate::model::{AgentOutcome, AgentStep, ArticleRecord, SearchFilters, SortMode};
use crate::provider::{ProviderClient, SearchQuery};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

const AGENT_SYSTEM_PROMPT: &str = "\
You are a literature research agent. Starting from the user's question, call \
search_papers to gather relevant papers, analyze_gaps to note missing \
coverage, and finish when coverage is sufficient. Prefer a few precise \
searches over many broad ones. Always end with finish, including your \
reasoning and a coverage summary.";

/// Controller states. The loop holds `Planning` while turns remain; any
/// terminal condition moves it to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Planning,
    Done,
}

/// Request-scoped session: conversation, dedup map, and step log. Discarded
/// when the request completes.
struct Session {
    messages: Vec<Value>,
    papers: Vec<ArticleRecord>,
    origins: Vec<String>,
    seen: HashSet<String>,
    steps: Vec<AgentStep>,
    searches: usize,
    state: AgentState,
    finish_reason: String,
}

#[derive(Clone)]
pub struct AgentPlanner {
    llm: LlmClient,
    provider: ProviderClient,
    cfg: AgentConfig,
}

impl AgentPlanner {
    pub fn new(llm: LlmClient, provider: ProviderClient, cfg: AgentConfig) -> Self {
        Self { llm, provider, cfg }
    }

    /// Runs the bounded tool loop. Returns `None` when no LLM credential is
    /// configured; the caller falls back to deterministic planning.
    pub async fn run(&self, question: &str, token: &str) -> Option<AgentOutcome> {
        if !self.llm.is_configured() {
            scout_telemetry::inc_llm_fallback("agent");
            return None;
        }
        let session_id = Uuid::new_v4();
        let mut s = Session {
            messages: vec![
                json!({"role": "system", "content": AGENT_SYSTEM_PROMPT}),
                json!({"role": "user", "content": question}),
            ],
            papers: vec![],
            origins: vec![],
            seen: HashSet::new(),
            steps: vec![],
            searches: 0,
            state: AgentState::Planning,
            finish_reason: String::new(),
        };
        let tools = tool_defs(self.cfg.search_limit_cap);

        let mut iteration = 0;
        while s.state == AgentState::Planning && iteration < self.cfg.max_iterations {
            iteration += 1;
            match self.llm.chat_once(&s.messages, &tools).await {
                Ok(TurnOutcome::Final(text)) => {
                    // Turn ended without invoking an action.
                    if !text.trim().is_empty() {
                        s.steps.push(AgentStep::Thinking { iteration, text: text.trim().to_string() });
                    }
                    s.finish_reason = "agent completed reasoning".into();
                    s.state = AgentState::Done;
                }
                Ok(TurnOutcome::ToolCalls(calls, assistant_msg)) => {
                    s.messages.push(assistant_msg);
                    for call in calls {
                        let args = call.arguments.unwrap_or_else(|| json!({}));
                        match call.name.as_str() {
                            "search_papers" => {
                                self.handle_search(&mut s, iteration, &call.id, &args, token).await;
                            }
                            "analyze_gaps" => {
                                handle_analysis(&mut s, iteration, &call.id, &args);
                            }
                            "finish" => {
                                handle_finish(&mut s, iteration, &args);
                            }
                            other => {
                                s.messages.push(tool_result(
                                    &call.id,
                                    &json!({"error": format!("unknown tool: {other}")}),
                                ));
                            }
                        }
                        if s.state == AgentState::Done {
                            break;
                        }
                    }
                }
                Err(e) => {
                    // Transport failure aborts the loop with papers so far.
                    warn!(%session_id, error = %e, "agent turn failed; terminating early");
                    s.steps.push(AgentStep::Error { iteration, message: e.to_string() });
                    s.finish_reason = format!("agent aborted: {e}");
                    s.state = AgentState::Done;
                }
            }
        }

        if s.state == AgentState::Planning {
            s.steps.push(AgentStep::MaxIterations { iteration });
            s.finish_reason = format!("reached iteration limit with {} papers", s.papers.len());
        }
        debug!(%session_id, papers = s.papers.len(), searches = s.searches, "agent session finished");
        Some(AgentOutcome {
            papers: s.papers,
            origins: s.origins,
            steps: s.steps,
            finish_reason: s.finish_reason,
            total_searches: s.searches,
        })
    }

    async fn handle_search(
        &self,
        s: &mut Session,
        iteration: usize,
        call_id: &str,
        args: &Value,
        token: &str,
    ) {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let search_type =
            args.get("search_type").and_then(|v| v.as_str()).unwrap_or("general").to_string();
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(10)
            .clamp(1, self.cfg.search_limit_cap);

        let (filters, sort) = filters_for(&search_type, Local::now().date_naive());
        let req = SearchQuery { query: query.clone(), filters, sort, limit };
        s.searches += 1;
        match self.provider.search(&req, token).await {
            Ok(resp) => {
                let found = resp.results.len();
                let mut new = 0;
                let mut sample: Vec<Value> = vec![];
                for article in resp.results {
                    let Some(doi) = article.doi.clone() else { continue };
                    if s.seen.insert(doi.clone()) {
                        new += 1;
                        if sample.len() < 5 {
                            sample.push(json!({"title": article.title, "doi": doi}));
                        }
                        s.papers.push(article);
                        s.origins.push(query.clone());
                    }
                }
                s.steps.push(AgentStep::Search {
                    iteration,
                    query,
                    search_type,
                    found,
                    new,
                });
                s.messages.push(tool_result(
                    call_id,
                    &json!({"found": found, "new": new, "total_collected": s.papers.len(), "sample": sample}),
                ));
            }
            Err(e) => {
                // A single failed search is recorded and skipped, never fatal.
                s.steps.push(AgentStep::Error { iteration, message: e.to_string() });
                s.messages.push(tool_result(
                    call_id,
                    &json!({"error": format!("search failed: {e}")}),
                ));
            }
        }
    }
}

fn handle_analysis(s: &mut Session, iteration: usize, call_id: &str, args: &Value) {
    let str_list = |key: &str| -> Vec<String> {
        args.get(key)
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|x| x.as_str()).map(|s| s.to_string()).collect())
            .unwrap_or_default()
    };
    s.steps.push(AgentStep::Analysis {
        iteration,
        coverage: args.get("current_coverage").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        gaps: str_list("missing_aspects"),
        suggestions: str_list("suggested_queries"),
    });
    // Advisory only; echoed back so the next turn can act on it.
    s.messages.push(tool_result(call_id, &json!({"status": "noted"})));
}

fn handle_finish(s: &mut Session, iteration: usize, args: &Value) {
    let reasoning = args.get("reasoning").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let coverage_summary =
        args.get("coverage_summary").and_then(|v| v.as_str()).unwrap_or("").to_string();
    s.finish_reason = if reasoning.is_empty() { "agent finished".into() } else { reasoning.clone() };
    s.steps.push(AgentStep::Finish { iteration, reasoning, coverage_summary });
    s.state = AgentState::Done;
}

fn tool_result(call_id: &str, content: &Value) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": call_id,
        "content": serde_json::to_string(content).unwrap_or_else(|_| "{}".into()),
    })
}

/// The recent window starts exactly three years before the call date, same
/// month and day. Feb 29 clamps to Feb 28.
pub(crate) fn recent_window_start(today: NaiveDate) -> NaiveDate {
    today
        .with_year(today.year() - 3)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year() - 3, 2, 28).expect("valid date"))
}

fn filters_for(search_type: &str, today: NaiveDate) -> (SearchFilters, SortMode) {
    match search_type {
        "title_focused" => (
            SearchFilters { field: Some("title".into()), ..SearchFilters::default() },
            SortMode::Relevance,
        ),
        "recent" => (
            SearchFilters {
                date_from: Some(recent_window_start(today).format("%Y-%m-%d").to_string()),
                ..SearchFilters::default()
            },
            SortMode::Recent,
        ),
        _ => (SearchFilters::default(), SortMode::Relevance),
    }
}

fn tool_defs(limit_cap: usize) -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "search_papers",
                "description": "Search the literature database. Returns counts and a sample of newly collected papers.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search terms"},
                        "search_type": {"type": "string", "enum": ["general", "title_focused", "recent"]},
                        "limit": {"type": "integer", "maximum": limit_cap, "description": "Max results for this search"}
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "analyze_gaps",
                "description": "Record what the collected papers cover and what is still missing.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "current_coverage": {"type": "string"},
                        "missing_aspects": {"type": "array", "items": {"type": "string"}},
                        "suggested_queries": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["current_coverage"],
                    "additionalProperties": false
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "finish",
                "description": "Stop searching and report why coverage is sufficient.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "reasoning": {"type": "string"},
                        "coverage_summary": {"type": "string"}
                    },
                    "required": ["reasoning"],
                    "additionalProperties": false
                }
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_window_is_exactly_three_years_back() {
        let d = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        assert_eq!(recent_window_start(d), NaiveDate::from_ymd_opt(2023, 8, 23).unwrap());
    }

    #[test]
    fn leap_day_clamps_to_feb_28() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(recent_window_start(d), NaiveDate::from_ymd_opt(2021, 2, 28).unwrap());
    }

    #[test]
    fn search_type_maps_to_filters() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (f, sort) = filters_for("title_focused", today);
        assert_eq!(f.field.as_deref(), Some("title"));
        assert_eq!(sort, SortMode::Relevance);

        let (f, sort) = filters_for("recent", today);
        assert_eq!(f.date_from.as_deref(), Some("2023-01-15"));
        assert_eq!(sort, SortMode::Recent);

        let (f, _) = filters_for("general", today);
        assert_eq!(f, SearchFilters::default());
    }
}
