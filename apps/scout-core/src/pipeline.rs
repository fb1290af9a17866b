//! The AI-assisted search flow: plan (deterministic or agentic), fan out
//! provider searches, aggregate, then optionally synthesize. Single failed
//! sub-queries are skipped; only a flow with zero usable searches errors out,
//! which the API layer turns into a plain-search fallback.

use crate::app::AppHandles;
use crate::model::{AgentStep, Intent, RankedEntry, RankingStats, SubQuery};
use crate::provider::SearchQuery;
use futures::future::join_all;
use tracing::{info, warn};

pub struct AgentMeta {
    pub steps: Vec<AgentStep>,
    pub finish_reason: String,
    pub total_searches: usize,
}

pub struct PipelineOutput {
    pub interpretation: String,
    pub intent: Option<Intent>,
    pub concepts: Vec<String>,
    pub searches: Vec<SubQuery>,
    pub entries: Vec<RankedEntry>,
    pub stats: RankingStats,
    pub synthesis: Option<String>,
    pub agent: Option<AgentMeta>,
    /// False when the rule-based fallback planner produced the plan.
    pub ai_planned: bool,
}

pub struct PipelineRequest<'a> {
    pub question: &'a str,
    pub token: &'a str,
    pub agentic: bool,
    pub synthesize: bool,
    pub limit: Option<usize>,
}

pub async fn run(handles: &AppHandles, req: PipelineRequest<'_>) -> anyhow::Result<PipelineOutput> {
    if req.agentic {
        if let Some(outcome) = handles.agent.run(req.question, req.token).await {
            let (mut entries, stats) = handles.aggregator.rank_agent(&outcome.papers, &outcome.origins);
            if let Some(limit) = req.limit {
                entries.truncate(limit.max(1));
            }
            let synthesis = if req.synthesize {
                handles.synthesizer.synthesize(req.question, None, &entries).await
            } else {
                None
            };
            info!(
                papers = stats.unique_papers,
                searches = outcome.total_searches,
                "agentic search complete"
            );
            return Ok(PipelineOutput {
                interpretation: format!(
                    "Agent-directed search ({} searches)",
                    outcome.total_searches
                ),
                intent: None,
                concepts: vec![],
                searches: vec![],
                entries,
                stats,
                synthesis,
                agent: Some(AgentMeta {
                    steps: outcome.steps,
                    finish_reason: outcome.finish_reason,
                    total_searches: outcome.total_searches,
                }),
                ai_planned: true,
            });
        }
        // No LLM credential: the agent signalled fallback; plan instead.
    }

    let planned = handles.planner.plan(req.question).await;
    let plan = planned.plan;
    let per_query_limit = handles.per_subquery_limit;

    // Sub-query searches are independent; aggregation is commutative, so
    // concurrent completion order cannot change the ranking.
    let futures = plan.searches.iter().map(|sq| {
        let q = SearchQuery {
            query: sq.query.clone(),
            filters: sq.filters.clone(),
            sort: Default::default(),
            limit: per_query_limit,
        };
        async move { (sq.clone(), handles.provider.search(&q, req.token).await) }
    });
    let mut batches = vec![];
    let mut failed = 0usize;
    for (sq, result) in join_all(futures).await {
        match result {
            Ok(resp) => batches.push((sq, resp.results)),
            Err(e) => {
                warn!(query = %sq.query, error = %e, "sub-query search failed; skipping");
                failed += 1;
            }
        }
    }
    if batches.is_empty() {
        anyhow::bail!("all {failed} sub-query searches failed");
    }

    let (mut entries, stats) = handles.aggregator.rank(&batches);
    if let Some(limit) = req.limit {
        entries.truncate(limit.max(1));
    }
    let synthesis = if req.synthesize {
        handles.synthesizer.synthesize(req.question, plan.intent, &entries).await
    } else {
        None
    };
    info!(
        subqueries = plan.searches.len(),
        failed,
        unique = stats.unique_papers,
        max_overlap = stats.max_overlap,
        "planned search complete"
    );
    Ok(PipelineOutput {
        interpretation: plan.interpretation,
        intent: plan.intent,
        concepts: plan.concepts,
        searches: plan.searches,
        entries,
        stats,
        synthesis,
        agent: None,
        ai_planned: planned.ai_generated,
    })
}
