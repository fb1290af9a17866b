//! Per-article single-sentence summaries, context-aware when the originating
//! search query is supplied. Falls back deterministically: leading sentences
//! of the abstract, or a templated title line when there is no abstract.

use crate::llm::LlmClient;
use crate::model::ArticleSummary;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const MAX_SUMMARY_CHARS: usize = 200;
/// A first sentence shorter than this pulls in the second one.
const SHORT_SENTENCE: usize = 100;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Clone)]
pub struct Summarizer {
    llm: LlmClient,
}

impl Summarizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    pub async fn summarize(
        &self,
        title: &str,
        abstract_text: Option<&str>,
        search_query: Option<&str>,
    ) -> ArticleSummary {
        let abstract_text = abstract_text.map(str::trim).filter(|a| !a.is_empty());
        match abstract_text {
            Some(text) => self.from_abstract(title, text, search_query).await,
            None => self.from_title(title, search_query).await,
        }
    }

    async fn from_abstract(
        &self,
        title: &str,
        abstract_text: &str,
        search_query: Option<&str>,
    ) -> ArticleSummary {
        if self.llm.is_configured() {
            let system = format!(
                "Summarize the paper abstract in ONE sentence of at most {MAX_SUMMARY_CHARS} characters.{}",
                search_query
                    .map(|q| format!(" Frame the summary around its relevance to the search \"{q}\"."))
                    .unwrap_or_default()
            );
            let user = format!("Title: {title}\n\nAbstract: {abstract_text}");
            match self.llm.complete(&system, &user).await {
                Ok(text) if !text.trim().is_empty() => {
                    return ArticleSummary {
                        summary: text.trim().to_string(),
                        ai_generated: true,
                        from_title: None,
                    };
                }
                Ok(_) => debug!("llm returned empty summary; using extractive fallback"),
                Err(e) => {
                    debug!(error = %e, "llm summary failed; using extractive fallback");
                    scout_telemetry::inc_llm_fallback("summary");
                }
            }
        }
        ArticleSummary {
            summary: leading_sentences(abstract_text),
            ai_generated: false,
            from_title: None,
        }
    }

    async fn from_title(&self, title: &str, search_query: Option<&str>) -> ArticleSummary {
        if self.llm.is_configured() && !title.trim().is_empty() {
            let system = format!(
                "Given only a paper title, write ONE brief sentence describing its likely subject.{}",
                search_query
                    .map(|q| format!(" The reader searched for \"{q}\"."))
                    .unwrap_or_default()
            );
            match self.llm.complete(&system, title).await {
                Ok(text) if !text.trim().is_empty() => {
                    return ArticleSummary {
                        summary: text.trim().to_string(),
                        ai_generated: true,
                        from_title: Some(true),
                    };
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "llm title summary failed; using template fallback");
                    scout_telemetry::inc_llm_fallback("summary");
                }
            }
        }
        ArticleSummary {
            summary: format!("Research on: {}", title.trim()),
            ai_generated: false,
            from_title: Some(true),
        }
    }
}

/// First one-to-two sentences of the abstract, markup stripped.
pub(crate) fn leading_sentences(text: &str) -> String {
    let cleaned = MARKUP_TAG.replace_all(text, " ");
    let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ").into_owned();

    let mut sentences = vec![];
    let mut start = 0;
    for (idx, ch) in cleaned.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let end = idx + ch.len_utf8();
            let next = cleaned[end..].chars().next();
            if next.is_none() || next == Some(' ') {
                let s = cleaned[start..end].trim();
                if !s.is_empty() {
                    sentences.push(s.to_string());
                }
                start = end;
            }
        }
    }
    let tail = cleaned[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    match sentences.as_slice() {
        [] => String::new(),
        [first] => first.clone(),
        [first, second, ..] if first.chars().count() < SHORT_SENTENCE => {
            format!("{first} {second}")
        }
        [first, ..] => first.clone(),
    }
}
