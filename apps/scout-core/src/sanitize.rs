//! Query sanitation. Strips code, markup, prompt-injection markers, and URLs
//! from raw user input before it reaches any LLM prompt or search call.

use crate::config::SanitizerConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]*`").unwrap());
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)\S+"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Fixed prompt-injection pattern set: role prefixes, instruction overrides,
/// template interpolation, special delimiter tokens.
static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(system|assistant|developer)\s*:",
        r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+instructions?",
        r"(?i)disregard\s+(all\s+)?(previous|prior|above)\s+instructions?",
        r"(?i)forget\s+(all\s+)?(previous|prior)\s+instructions?",
        r"\{\{[^}]*\}\}",
        r"\$\{[^}]*\}",
        r"<%[^%]*%>",
        r"<\|[^|]*\|>",
        r"(?i)\[/?INST\]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub text: String,
    /// Set when sanitization removed more than the configured share of the
    /// input. Annotation only; callers log and count it, never block on it.
    pub suspicious: bool,
}

impl Sanitized {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Clone)]
pub struct Sanitizer {
    cfg: SanitizerConfig,
    injection_patterns: Vec<Regex>,
}

impl Sanitizer {
    pub fn new(cfg: SanitizerConfig) -> Self {
        Self { cfg, injection_patterns: INJECTION_PATTERNS.clone() }
    }

    /// Rules run in a fixed order: code spans, markup tags, injection
    /// patterns, URLs, length cap, whitespace collapse.
    pub fn sanitize(&self, raw: &str) -> Sanitized {
        // Whitespace-normalized baseline, so collapsing runs of spaces does
        // not count as removed content.
        let original_len = WHITESPACE.replace_all(raw.trim(), " ").chars().count();

        let mut text = FENCED_CODE.replace_all(raw, " ").into_owned();
        text = INLINE_CODE.replace_all(&text, " ").into_owned();
        text = MARKUP_TAG.replace_all(&text, " ").into_owned();
        for pat in &self.injection_patterns {
            text = pat.replace_all(&text, " ").into_owned();
        }
        text = URL.replace_all(&text, " ").into_owned();

        if text.chars().count() > self.cfg.max_len {
            text = text.chars().take(self.cfg.max_len).collect();
        }
        let text = WHITESPACE.replace_all(text.trim(), " ").into_owned();

        let kept = text.chars().count();
        let removed = original_len.saturating_sub(kept);
        let suspicious =
            original_len > 0 && (removed as f64) > (original_len as f64) * self.cfg.suspicion_ratio;

        Sanitized { text, suspicious }
    }
}
