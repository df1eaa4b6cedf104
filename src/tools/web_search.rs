//! 网页搜索工具：LangSearch 风格的 web-search 接口
//!
//! POST {api_base}，Bearer 鉴权，body {query, freshness, count}；
//! 响应原样透传给模型（该接口本身就返回精简结果）。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::tools::Tool;

const DEFAULT_RESULT_COUNT: u64 = 5;

pub struct WebSearchTool {
    client: Client,
    api_base: String,
    api_key: String,
}

impl WebSearchTool {
    pub fn new(api_base: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("LANGSEARCH_API_KEY").ok())
            .unwrap_or_default();
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_base: api_base.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Args: query (required), count (number of results, default 5)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "count": {"type": "integer", "description": "Number of results", "default": 5}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing query".to_string())?;
        let count = args
            .get("count")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_RESULT_COUNT);

        let resp = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "query": query,
                "freshness": "onLimit",
                "count": count,
            }))
            .send()
            .await
            .map_err(|e| format!("Web search request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("Web search returned HTTP {}", resp.status()));
        }
        resp.text()
            .await
            .map_err(|e| format!("Read web search body: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_query_is_an_error() {
        let tool = WebSearchTool::new("http://127.0.0.1:1", Some("k"), 1);
        let err = tool.execute(serde_json::json!({"count": 3})).await.unwrap_err();
        assert!(err.contains("Missing query"));
    }
}
