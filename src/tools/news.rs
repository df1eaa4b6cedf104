//! 公司新闻工具：NewsAPI 风格的 everything 查询
//!
//! GET {api_base}?q=...&from=...&sortBy=...&apiKey=...；结果裁剪为标题/来源/
//! 日期/链接的精简 JSON，避免把整页响应灌进上下文。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::tools::Tool;

const DEFAULT_SORT: &str = "popularity";
const MAX_ARTICLES: usize = 8;

pub struct CompanyNewsTool {
    client: Client,
    api_base: String,
    api_key: String,
}

impl CompanyNewsTool {
    pub fn new(api_base: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("NEWS_API_KEY").ok())
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

    async fn fetch(&self, keyword: &str, from_date: &str, sort_by: &str) -> Result<Value, String> {
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("q", keyword),
                ("from", from_date),
                ("sortBy", sort_by),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("News request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("News API returned HTTP {}", resp.status()));
        }
        resp.json().await.map_err(|e| format!("News response not JSON: {}", e))
    }
}

/// 裁剪文章列表，只保留模型需要的字段
fn trim_articles(body: &Value) -> Value {
    let articles = body
        .get("articles")
        .and_then(|a| a.as_array())
        .map(|list| {
            list.iter()
                .take(MAX_ARTICLES)
                .map(|a| {
                    serde_json::json!({
                        "title": a.get("title").cloned().unwrap_or(Value::Null),
                        "source": a.pointer("/source/name").cloned().unwrap_or(Value::Null),
                        "publishedAt": a.get("publishedAt").cloned().unwrap_or(Value::Null),
                        "url": a.get("url").cloned().unwrap_or(Value::Null),
                        "description": a.get("description").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    serde_json::json!({
        "totalResults": body.get("totalResults").cloned().unwrap_or(Value::Null),
        "articles": articles,
    })
}

#[async_trait]
impl Tool for CompanyNewsTool {
    fn name(&self) -> &str {
        "search_company_news"
    }

    fn description(&self) -> &str {
        "Search recent news about a company or topic. Args: keyword (required), from_date (YYYY-MM-DD, defaults to 7 days ago), sort_by (popularity/relevancy/publishedAt)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "keyword": {"type": "string", "description": "Company name or topic to search"},
                "from_date": {"type": "string", "description": "Earliest article date, YYYY-MM-DD"},
                "sort_by": {"type": "string", "enum": ["popularity", "relevancy", "publishedAt"]}
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let keyword = args
            .get("keyword")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing keyword".to_string())?;
        let default_from = (chrono::Utc::now().date_naive() - chrono::Duration::days(7)).to_string();
        let from_date = args
            .get("from_date")
            .and_then(|v| v.as_str())
            .unwrap_or(&default_from);
        let sort_by = args
            .get("sort_by")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_SORT)
            .to_lowercase();

        let body = self.fetch(keyword, from_date, &sort_by).await?;
        serde_json::to_string(&trim_articles(&body)).map_err(|e| e.to_string())
    }
}
