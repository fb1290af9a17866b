use axum::body::{to_bytes, Body};
use axum::extract::Query;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use scout_core::{api, app, config};
use std::collections::HashMap;
use tower::ServiceExt;

fn paper(doi: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "authors": ["A. Researcher"],
        "abstract": "We report detailed results on the subject.",
        "journal": "Phys. Rev. Lett.",
        "pubDate": "2024-06-01",
        "doi": doi,
        "url": format!("https://doi.org/{doi}"),
        "citations": 12
    })
}

/// Every query returns one shared paper plus one paper unique to the query,
/// so overlapping sub-queries corroborate the shared one.
async fn overlap_search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    let unique = format!("10.9/{}", q.replace(' ', "-"));
    Json(serde_json::json!({
        "total": 2,
        "results": [paper("10.9/shared", "The corroborated paper"), paper(&unique, &format!("Unique to {q}"))]
    }))
}

/// Fails unless the query is the full question (contains "effect"), which
/// only the plain-search fallback sends.
async fn flaky_search(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    let q = params.get("q").cloned().unwrap_or_default();
    if q.contains("effect") {
        Json(serde_json::json!({"total": 1, "results": [paper("10.9/plain", "Plain result")]}))
            .into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "no").into_response()
    }
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

/// Chat-completions mock: routes on the system prompt to a canned plan or a
/// canned grounded synthesis.
async fn mock_llm(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    let system = body["messages"][0]["content"].as_str().unwrap_or("");
    let content = if system.contains("literature search planner") {
        r#"{"interpretation":"Compare the two materials","intent":"comparative",
            "concepts":["graphene","silicene"],
            "searches":[{"query":"graphene","purpose":"graphene","weight":2.2},
                        {"query":"silicene","purpose":"silicene","weight":2.0}]}"#
            .to_string()
    } else if system.contains("Rules:") {
        "The abstracts describe both materials [1][2].".to_string()
    } else {
        "One sentence.".to_string()
    };
    Json(serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", "Bearer good-token")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn fallback_plan_ranks_corroborated_papers_first() {
    let base = spawn(Router::new().route("/search", get(overlap_search))).await;
    let mut cfg = config::Config::default();
    cfg.provider.base = base;
    cfg.llm.api_key = None;
    let router = api::build_router(app::AppState::new(cfg));

    let resp = router
        .oneshot(post_json(
            "/api/search/ai",
            serde_json::json!({"query": "What effect does gravity have on biology?"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;

    let analysis = &v["aiAnalysis"];
    assert_eq!(analysis["aiPlanned"], false);
    let searches = analysis["searches"].as_array().unwrap();
    assert_eq!(searches.len(), 3);
    assert!(searches.iter().any(|s| s["purpose"] == "intersection"
        && s["query"] == "gravity biology"
        && s["weight"] == 1.8));
    let concepts: Vec<&str> =
        analysis["concepts"].as_array().unwrap().iter().filter_map(|c| c.as_str()).collect();
    assert!(concepts.contains(&"gravity") && concepts.contains(&"biology"));
    assert!(!concepts.contains(&"effect"));
    // No LLM key: synthesis must be absent, never an error.
    assert!(analysis.get("synthesis").is_none());

    assert_eq!(v["ranking"]["maxOverlap"], 3);
    assert_eq!(v["ranking"]["uniquePapers"], 4);
    assert_eq!(v["total"], 4);
    assert_eq!(v["ranking"]["multiSource"], 1);
    let results = v["results"].as_array().unwrap();
    assert_eq!(results[0]["doi"], "10.9/shared");
    assert_eq!(results[0]["overlap"], 3);
    assert_eq!(results[0]["sources"].as_array().unwrap().len(), 3);
    assert!(v.get("fallback").is_none());
}

#[tokio::test]
async fn quantum_entanglement_end_to_end_fallback() {
    let base = spawn(Router::new().route("/search", get(overlap_search))).await;
    let mut cfg = config::Config::default();
    cfg.provider.base = base;
    cfg.llm.api_key = None;
    let router = api::build_router(app::AppState::new(cfg));

    let resp = router
        .oneshot(post_json("/api/search/ai", serde_json::json!({"query": "quantum entanglement"})))
        .await
        .unwrap();
    let v = body_json(resp).await;
    let searches = v["aiAnalysis"]["searches"].as_array().unwrap();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0]["query"], "quantum entanglement");
    assert_eq!(searches[0]["purpose"], "quantum entanglement");
    assert_eq!(searches[0]["weight"], 2.0);
}

#[tokio::test]
async fn llm_plan_with_synthesis() {
    let provider_base = spawn(Router::new().route("/search", get(overlap_search))).await;
    let llm_base = spawn(Router::new().route("/v1/chat/completions", post(mock_llm))).await;
    let mut cfg = config::Config::default();
    cfg.provider.base = provider_base;
    cfg.llm.endpoint = format!("{llm_base}/v1/chat/completions");
    cfg.llm.api_key = Some("test-key".into());
    let router = api::build_router(app::AppState::new(cfg));

    let resp = router
        .oneshot(post_json(
            "/api/search/ai",
            serde_json::json!({"query": "How does graphene compare to silicene?"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    let analysis = &v["aiAnalysis"];
    assert_eq!(analysis["aiPlanned"], true);
    assert_eq!(analysis["intent"], "comparative");
    assert_eq!(analysis["searches"].as_array().unwrap().len(), 2);
    assert_eq!(analysis["synthesis"], "The abstracts describe both materials [1][2].");
    assert_eq!(v["ranking"]["uniquePapers"], 3);
}

#[tokio::test]
async fn total_ai_failure_substitutes_plain_search_with_fallback_label() {
    let base = spawn(Router::new().route("/search", get(flaky_search))).await;
    let mut cfg = config::Config::default();
    cfg.provider.base = base;
    cfg.llm.api_key = None;
    let router = api::build_router(app::AppState::new(cfg));

    let resp = router
        .oneshot(post_json(
            "/api/search/ai",
            serde_json::json!({"query": "What effect does gravity have on biology?"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = body_json(resp).await;
    assert_eq!(v["fallback"], true);
    assert!(v["aiAnalysis"].is_null());
    assert!(v["ranking"].is_null());
    assert_eq!(v["results"][0]["doi"], "10.9/plain");
}

#[tokio::test]
async fn total_failure_of_both_paths_is_502() {
    async fn always_500() -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response()
    }
    let base = spawn(Router::new().route("/search", get(always_500))).await;
    let mut cfg = config::Config::default();
    cfg.provider.base = base;
    cfg.llm.api_key = None;
    let router = api::build_router(app::AppState::new(cfg));

    let resp = router
        .oneshot(post_json("/api/search/ai", serde_json::json!({"query": "gravity"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}
