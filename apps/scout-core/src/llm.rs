//! Chat-completions client. A missing API key makes the client unconfigured:
//! every AI call site checks `is_configured()` and takes its deterministic
//! fallback instead of failing the request.

use crate::config::LlmConfig;
use anyhow::Result;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    key: Option<String>,
}

pub enum TurnOutcome {
    /// Assistant replied with plain text; no tool was invoked.
    Final(String),
    /// Assistant invoked tools; carries the calls and the raw assistant
    /// message to append to the conversation.
    ToolCalls(Vec<ToolCall>, Value),
}

pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Option<Value>,
}

impl LlmClient {
    pub fn new(cfg: &LlmConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("paperscout/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            key: cfg.api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Single-turn completion: system instruction + user content, text out.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages = vec![
            json!({"role": "system", "content": system}),
            json!({"role": "user", "content": user}),
        ];
        match self.chat_once(&messages, &[]).await? {
            TurnOutcome::Final(text) => Ok(text),
            TurnOutcome::ToolCalls(..) => anyhow::bail!("unexpected tool call in plain completion"),
        }
    }

    /// One chat turn with an optional tool schema.
    pub async fn chat_once(&self, messages: &[Value], tools: &[Value]) -> Result<TurnOutcome> {
        #[derive(serde::Deserialize)]
        struct Choice {
            message: Value,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        let key = self.key.as_deref().ok_or_else(|| anyhow::anyhow!("no LLM credential configured"))?;
        let mut body = json!({"model": self.model, "messages": messages});
        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            anyhow::bail!("llm http {}: {}", status, snip(&txt, 400));
        }
        let v: Resp = resp.json().await?;
        let msg = v
            .choices
            .first()
            .map(|c| c.message.clone())
            .unwrap_or_else(|| json!({"role": "assistant", "content": ""}));
        if let Some(tc) = msg.get("tool_calls").and_then(|x| x.as_array()) {
            let mut calls = vec![];
            for c in tc {
                let id = c.get("id").and_then(|s| s.as_str()).unwrap_or("").to_string();
                let name = c
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|s| s.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = c
                    .get("function")
                    .and_then(|f| f.get("arguments"))
                    .and_then(|s| s.as_str())
                    .and_then(|s| serde_json::from_str::<Value>(s).ok());
                calls.push(ToolCall { id, name, arguments });
            }
            return Ok(TurnOutcome::ToolCalls(calls, msg));
        }
        let reply = msg.get("content").and_then(|s| s.as_str()).unwrap_or("").to_string();
        Ok(TurnOutcome::Final(reply))
    }
}

/// Char-boundary-safe preview of an error body.
fn snip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}

/// Extract the first JSON object substring from a completion that may wrap it
/// in prose or a code fence.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, ch) in text[start..].char_indices() {
        if in_str {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
