use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the literature search API.
    pub base: String,
    /// Fallback bearer token when the caller sends no Authorization header.
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Provider-side page cap; request limits are clamped to this.
    pub max_limit: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base: "https://api.scholarsearch.io/v1".into(),
            token: None,
            timeout_secs: 15,
            max_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint. Overridable for tests via SCOUT_LLM_ENDPOINT.
    pub endpoint: String,
    pub model: String,
    /// Taken from OPENAI_API_KEY when absent. No key means every AI step
    /// falls back deterministically.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Bonus added per extra corroborating sub-query.
    pub overlap_bonus: f64,
    /// Mild within-query rank decay per position.
    pub rank_decay: f64,
    /// Final ranked output cap.
    pub max_results: usize,
    /// Results requested per sub-query.
    pub per_subquery_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { overlap_bonus: 1.5, rank_decay: 0.02, max_results: 20, per_subquery_limit: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Cap on per-search result counts the agent may request.
    pub search_limit_cap: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 4, search_limit_cap: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub max_len: usize,
    /// Fraction of input that sanitization may remove before the query is
    /// flagged suspicious (log/metric only, never blocks).
    pub suspicion_ratio: f64,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self { max_len: 500, suspicion_ratio: 0.2 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub llm: LlmConfig,
    pub ranking: RankingConfig,
    pub agent: AgentConfig,
    pub sanitizer: SanitizerConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<(Self, PathBuf)> {
        let cfg_path = env::var("SCOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/scout.toml"));
        let text = fs::read_to_string(&cfg_path)?;
        let mut cfg: Config = toml::from_str(&text)?;
        cfg.apply_env();
        Ok((cfg, cfg_path))
    }

    /// Env overrides applied after file load (and by tests on defaults).
    pub fn apply_env(&mut self) {
        if let Ok(base) = env::var("SCOUT_PROVIDER_BASE") {
            self.provider.base = base;
        }
        if let Ok(token) = env::var("SCOUT_PROVIDER_TOKEN") {
            self.provider.token = Some(token);
        }
        if let Ok(endpoint) = env::var("SCOUT_LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = env::var("OPENAI_API_KEY").ok();
        }
    }
}
