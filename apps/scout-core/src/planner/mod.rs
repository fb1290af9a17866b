//! Deterministic planner: one LLM call turns a sanitized question into a
//! weighted multi-query `SearchPlan`. Malformed output, a missing credential,
//! or any transport failure falls back to the rule-based keyword planner.

pub mod fallback;

use crate::llm::{extract_json_object, LlmClient};
use crate::model::{Intent, SearchFilters, SearchPlan, SubQuery};
use fallback::FallbackPlanner;
use serde::Deserialize;
use tracing::{debug, warn};

const MAX_SUBQUERIES: usize = 4;

const PLANNER_SYSTEM_PROMPT: &str = "\
You are a literature search planner for physics research questions.
Extract the specific physics concepts from the user's question. Do not treat \
generic relational words (effect, cause, impact, role, result, study) as concepts.
Classify the question intent as one of: explainer, survey, specific, author, comparative.
Then produce 2 to 4 weighted sub-queries. Guidance per intent:
- explainer: prefer review articles (articleTypes: [\"review\"]) for at least one sub-query
- survey: add a dateFrom floor covering roughly the last five years
- specific: use field \"title\" on the most precise sub-query
- author: use field \"author\" targeting the named author
- comparative: one sub-query per compared concept
Respond with JSON only, in exactly this shape:
{\"interpretation\": string, \"intent\": string, \"concepts\": [string], \
\"searches\": [{\"query\": string, \"purpose\": string, \"weight\": number, \
\"field\": string?, \"dateFrom\": string?, \"articleTypes\": [string]?}]}
Weights range 0.5 (speculative) to 2.5 (core concept).";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanDraft {
    interpretation: Option<String>,
    intent: Option<String>,
    concepts: Option<Vec<String>>,
    searches: Option<Vec<SearchDraft>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDraft {
    query: String,
    purpose: Option<String>,
    weight: Option<f64>,
    field: Option<String>,
    date_from: Option<String>,
    article_types: Option<Vec<String>>,
}

pub struct PlanOutcome {
    pub plan: SearchPlan,
    /// False when the rule-based fallback produced the plan.
    pub ai_generated: bool,
}

#[derive(Clone)]
pub struct Planner {
    llm: LlmClient,
    fallback: FallbackPlanner,
}

impl Planner {
    pub fn new(llm: LlmClient, fallback: FallbackPlanner) -> Self {
        Self { llm, fallback }
    }

    pub async fn plan(&self, question: &str) -> PlanOutcome {
        if !self.llm.is_configured() {
            scout_telemetry::inc_llm_fallback("plan");
            return PlanOutcome { plan: self.fallback.plan(question), ai_generated: false };
        }
        match self.plan_with_llm(question).await {
            Ok(plan) => PlanOutcome { plan, ai_generated: true },
            Err(e) => {
                warn!(error = %e, "llm planning failed; using rule-based fallback");
                scout_telemetry::inc_llm_fallback("plan");
                PlanOutcome { plan: self.fallback.plan(question), ai_generated: false }
            }
        }
    }

    async fn plan_with_llm(&self, question: &str) -> anyhow::Result<SearchPlan> {
        let text = self.llm.complete(PLANNER_SYSTEM_PROMPT, question).await?;
        let obj = extract_json_object(&text)
            .ok_or_else(|| anyhow::anyhow!("planner response contained no JSON object"))?;
        let draft: PlanDraft = serde_json::from_str(obj)?;
        let plan = validate_draft(draft)?;
        debug!(searches = plan.searches.len(), "llm plan accepted");
        Ok(plan)
    }
}

/// Strict boundary validation: any shape mismatch routes to the fallback
/// rather than propagating malformed data downstream.
fn validate_draft(draft: PlanDraft) -> anyhow::Result<SearchPlan> {
    let searches = draft.searches.unwrap_or_default();
    if searches.is_empty() {
        anyhow::bail!("plan has no searches");
    }
    let mut out: Vec<SubQuery> = vec![];
    for s in searches {
        let query = s.query.trim().to_string();
        if query.is_empty() {
            continue;
        }
        let purpose = s.purpose.unwrap_or_else(|| query.clone());
        let filters = SearchFilters {
            field: s.field.filter(|f| !f.trim().is_empty()),
            date_from: s.date_from.filter(|d| !d.trim().is_empty()),
            article_types: s.article_types.unwrap_or_default(),
        };
        out.push(SubQuery::new(query, purpose, s.weight.unwrap_or(1.0)).with_filters(filters));
    }
    if out.is_empty() {
        anyhow::bail!("plan searches were all empty");
    }
    out.truncate(MAX_SUBQUERIES);
    Ok(SearchPlan {
        interpretation: draft.interpretation.unwrap_or_default(),
        intent: draft.intent.as_deref().and_then(Intent::parse),
        concepts: draft.concepts.unwrap_or_default(),
        searches: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_validation_clamps_and_truncates() {
        let draft: PlanDraft = serde_json::from_str(
            r#"{"interpretation":"i","intent":"survey","concepts":["a"],
                "searches":[
                  {"query":"a","weight":9.0},
                  {"query":"b","weight":0.1},
                  {"query":"c"},
                  {"query":"d"},
                  {"query":"e"}
                ]}"#,
        )
        .unwrap();
        let plan = validate_draft(draft).unwrap();
        assert_eq!(plan.searches.len(), 4);
        assert_eq!(plan.searches[0].weight, 2.5);
        assert_eq!(plan.searches[1].weight, 0.5);
        assert_eq!(plan.intent, Some(Intent::Survey));
    }

    #[test]
    fn empty_searches_is_an_error() {
        let draft: PlanDraft =
            serde_json::from_str(r#"{"interpretation":"i","searches":[]}"#).unwrap();
        assert!(validate_draft(draft).is_err());
        let draft: PlanDraft = serde_json::from_str(r#"{"interpretation":"i"}"#).unwrap();
        assert!(validate_draft(draft).is_err());
    }

    #[test]
    fn unknown_intent_maps_to_none() {
        let draft: PlanDraft = serde_json::from_str(
            r#"{"intent":"weird","searches":[{"query":"x"}]}"#,
        )
        .unwrap();
        let plan = validate_draft(draft).unwrap();
        assert!(plan.intent.is_none());
    }
}
