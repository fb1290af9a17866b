//! Citation-grounded synthesis. Produces a short answer built strictly from
//! the supplied abstracts, or nothing at all: synthesis is an optional
//! enhancement and never fails the surrounding search.

use crate::llm::LlmClient;
use crate::model::{Intent, RankedEntry};
use tracing::warn;

/// At most this many top-ranked articles feed the synthesis prompt.
const MAX_SOURCES: usize = 5;

const GROUNDING_RULES: &str = "\
Rules:
- Use ONLY the abstracts below. Do not draw on any outside knowledge.
- Attach a citation marker like [1] or [2] to every factual claim, referring \
to the numbered abstracts.
- Answer in at most 2-3 sentences.
- If the abstracts do not contain enough information to answer, say so and \
describe what the abstracts DO cover instead. Never fabricate an answer.";

#[derive(Clone)]
pub struct Synthesizer {
    llm: LlmClient,
}

impl Synthesizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        intent: Option<Intent>,
        entries: &[RankedEntry],
    ) -> Option<String> {
        if entries.is_empty() || !self.llm.is_configured() {
            return None;
        }
        let (system, user) = build_prompt(question, intent, entries);
        match self.llm.complete(&system, &user).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() { None } else { Some(text) }
            }
            Err(e) => {
                warn!(error = %e, "synthesis failed; omitting");
                scout_telemetry::inc_llm_fallback("synthesis");
                None
            }
        }
    }
}

/// Intent changes only the framing line, never the grounding rules.
fn framing(intent: Option<Intent>) -> &'static str {
    match intent {
        Some(Intent::Explainer) => "Explain the concept the question asks about.",
        Some(Intent::Survey) => "Summarize the findings across these abstracts.",
        Some(Intent::Specific) => "Answer the specific question precisely.",
        Some(Intent::Author) => "Describe this author's work as reflected in these abstracts.",
        Some(Intent::Comparative) => "Compare the subjects using only these abstracts.",
        None => "Answer the question.",
    }
}

fn build_prompt(
    question: &str,
    intent: Option<Intent>,
    entries: &[RankedEntry],
) -> (String, String) {
    let system = format!("{}\n{}", framing(intent), GROUNDING_RULES);
    let mut user = format!("Question: {question}\n\nAbstracts:\n");
    for (i, entry) in entries.iter().take(MAX_SOURCES).enumerate() {
        let a = &entry.article;
        let abstract_text = if a.abstract_text.is_empty() { "(no abstract)" } else { &a.abstract_text };
        user.push_str(&format!("[{}] {} — {}\n", i + 1, a.title, abstract_text));
    }
    (system, user)
}
