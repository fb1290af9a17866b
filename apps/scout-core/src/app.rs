use crate::agent::AgentPlanner;
use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::planner::fallback::{FallbackConfig, FallbackPlanner};
use crate::planner::Planner;
use crate::provider::ProviderClient;
use crate::sanitize::Sanitizer;
use crate::summarize::Summarizer;
use crate::synthesis::Synthesizer;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppHandles {
    pub provider: ProviderClient,
    pub sanitizer: Sanitizer,
    pub planner: Planner,
    pub agent: AgentPlanner,
    pub aggregator: Aggregator,
    pub synthesizer: Synthesizer,
    pub summarizer: Summarizer,
    /// Results requested per sub-query on the deterministic path.
    pub per_subquery_limit: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub version: &'static str,
    pub config: Arc<RwLock<Config>>,
    pub handles: AppHandles,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> SharedState {
        let provider = ProviderClient::new(&config.provider);
        let llm = LlmClient::new(&config.llm);
        let sanitizer = Sanitizer::new(config.sanitizer.clone());
        let fallback = FallbackPlanner::new(FallbackConfig::default());
        let planner = Planner::new(llm.clone(), fallback);
        let agent = AgentPlanner::new(llm.clone(), provider.clone(), config.agent.clone());
        let aggregator = Aggregator::new(config.ranking.clone());
        let synthesizer = Synthesizer::new(llm.clone());
        let summarizer = Summarizer::new(llm);
        let per_subquery_limit = config.ranking.per_subquery_limit;

        Arc::new(AppState {
            version: env!("CARGO_PKG_VERSION"),
            config: Arc::new(RwLock::new(config)),
            handles: AppHandles {
                provider,
                sanitizer,
                planner,
                agent,
                aggregator,
                synthesizer,
                summarizer,
                per_subquery_limit,
            },
        })
    }
}
