use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};
use tracing_subscriber::{fmt, EnvFilter};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static API_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    let cv = CounterVec::new(Opts::new("scout_api_requests_total", "API requests total"), &["path"]).unwrap();
    REGISTRY.register(Box::new(cv.clone())).ok();
    cv
});
static PROVIDER_SEARCHES: Lazy<CounterVec> = Lazy::new(|| {
    let cv = CounterVec::new(
        Opts::new("scout_provider_searches_total", "Search provider calls by outcome"),
        &["outcome"],
    )
    .unwrap();
    REGISTRY.register(Box::new(cv.clone())).ok();
    cv
});
static LLM_FALLBACKS: Lazy<CounterVec> = Lazy::new(|| {
    let cv = CounterVec::new(
        Opts::new("scout_llm_fallbacks_total", "Deterministic fallbacks taken by pipeline stage"),
        &["stage"],
    )
    .unwrap();
    REGISTRY.register(Box::new(cv.clone())).ok();
    cv
});
static SUSPICIOUS_QUERIES: Lazy<CounterVec> = Lazy::new(|| {
    let cv = CounterVec::new(
        Opts::new("scout_suspicious_queries_total", "Queries where sanitization removed >20% of input"),
        &["endpoint"],
    )
    .unwrap();
    REGISTRY.register(Box::new(cv.clone())).ok();
    cv
});

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = fmt().with_env_filter(filter).with_target(false);
    // Enable JSON logs if SCOUT_LOG_JSON=1
    if std::env::var("SCOUT_LOG_JSON").ok().as_deref() == Some("1") {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

pub fn inc_api_request(path: &str) { API_REQUESTS.with_label_values(&[path]).inc(); }
pub fn inc_provider_search(outcome: &str) { PROVIDER_SEARCHES.with_label_values(&[outcome]).inc(); }
pub fn inc_llm_fallback(stage: &str) { LLM_FALLBACKS.with_label_values(&[stage]).inc(); }
pub fn inc_suspicious_query(endpoint: &str) { SUSPICIOUS_QUERIES.with_label_values(&[endpoint]).inc(); }

pub fn gather_prometheus() -> String {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    String::from_utf8(buffer).unwrap_or_default()
}
