//! Google 搜索工具：Custom Search JSON API
//!
//! GET {api_base}?key=...&cx=...&q=...；items 裁剪为标题/摘要/链接的精简
//! JSON，limit 控制条数。与 web_search 并存：模型按描述自行选用。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::tools::Tool;

const DEFAULT_LIMIT: usize = 5;

pub struct GoogleSearchTool {
    client: Client,
    api_base: String,
    cx: String,
    api_key: String,
}

impl GoogleSearchTool {
    pub fn new(api_base: &str, cx: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("GOOGLE_SEARCH_API_KEY").ok())
            .unwrap_or_default();
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_base: api_base.to_string(),
            cx: cx.to_string(),
            api_key,
        }
    }

    async fn fetch(&self, keyword: &str) -> Result<Value, String> {
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", keyword),
            ])
            .send()
            .await
            .map_err(|e| format!("Google search request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Google search returned HTTP {}", resp.status()));
        }
        resp.json()
            .await
            .map_err(|e| format!("Google search response not JSON: {}", e))
    }
}

/// 裁剪搜索结果条目，只保留标题、摘要与链接
fn trim_items(body: &Value, limit: usize) -> Value {
    let items = body
        .get("items")
        .and_then(|a| a.as_array())
        .map(|list| {
            list.iter()
                .take(limit)
                .map(|item| {
                    serde_json::json!({
                        "headline": item.get("title").cloned().unwrap_or(Value::Null),
                        "summary": item.get("snippet").cloned().unwrap_or(Value::Null),
                        "link": item.get("link").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    serde_json::json!({ "results": items })
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Performs a Google web search and returns summarized results including headlines and article summaries based on a search keyword and result limit."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "keyword": {"type": "string", "description": "The term or phrase to search for"},
                "limit": {"type": "integer", "description": "Maximum number of results to return", "default": 5}
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        // 模型偶尔会把关键词整个包进引号里
        let keyword = args
            .get("keyword")
            .and_then(|v| v.as_str())
            .map(|s| s.trim_matches(|c: char| c.is_whitespace() || "\"',.".contains(c)))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing keyword".to_string())?;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let body = self.fetch(keyword).await?;
        serde_json::to_string(&trim_items(&body, limit)).map_err(|e| e.to_string())
    }
}
