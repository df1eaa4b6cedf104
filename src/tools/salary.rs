//! 薪资查询工具：Glassdoor（RapidAPI）实时薪资接口
//!
//! 按公司名查询；location 先经 location 接口解析为 locationId，再连同
//! jobFunction / yearOfExperience / sort / limit / page 一起放进请求头
//! （该接口的约定如此），query 参数只带公司名。

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::tools::Tool;

/// 接口接受的工作年限取值
const YEARS_OF_EXPERIENCE: &[&str] = &[
    "LESS_THAN_ONE",
    "ONE_TO_THREE",
    "FOUR_TO_SIX",
    "SEVEN_TO_NINE",
    "TEN_TO_FOURTEEN",
    "ABOVE_FIFTEEN",
];

/// 接口接受的排序取值
const SORT_OPTIONS: &[&str] = &[
    "POPULAR",
    "UGC_SALARY_COUNT_DESC",
    "TOTAL_PAY_DESC",
    "TOTAL_PAY_ASC",
];

const DEFAULT_LIMIT: u64 = 10;
const MAX_RESULT_CHARS: usize = 8000;

pub struct SalaryLookupTool {
    client: Client,
    api_base: String,
    location_api_base: String,
    api_host: String,
    api_key: String,
}

impl SalaryLookupTool {
    pub fn new(
        api_base: &str,
        location_api_base: &str,
        api_host: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("RAPID_API_KEY").ok())
            .unwrap_or_default();
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_base: api_base.to_string(),
            location_api_base: location_api_base.to_string(),
            api_host: api_host.to_string(),
            api_key,
        }
    }

    fn base_headers(&self) -> Result<HeaderMap, String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-rapidapi-host"),
            HeaderValue::from_str(&self.api_host).map_err(|e| e.to_string())?,
        );
        headers.insert(
            HeaderName::from_static("x-rapidapi-key"),
            HeaderValue::from_str(&self.api_key).map_err(|e| e.to_string())?,
        );
        Ok(headers)
    }

    async fn resolve_location(&self, headers: &HeaderMap, location: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(&self.location_api_base)
            .headers(headers.clone())
            .query(&[("query", location)])
            .send()
            .await
            .map_err(|e| format!("Location lookup failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Location lookup returned HTTP {}", resp.status()));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("Location response not JSON: {}", e))?;
        body.pointer("/data/0/locationId")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| format!("No location match for {:?}", location))
    }

    fn push_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), String> {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).map_err(|e| e.to_string())?,
        );
        Ok(())
    }
}

#[async_trait]
impl Tool for SalaryLookupTool {
    fn name(&self) -> &str {
        "search_job_salary"
    }

    fn description(&self) -> &str {
        "Retrieve salary data for a specific job based on company, location, job function, and experience."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "company_name": {"type": "string", "description": "The name of the company"},
                "location": {"type": "string", "description": "Location to scope salary data to"},
                "job_function": {"type": "string", "description": "Job function to search for"},
                "year_of_experience": {"type": "string", "enum": YEARS_OF_EXPERIENCE},
                "limit": {"type": "integer", "description": "Results per page", "default": 10},
                "page": {"type": "integer", "description": "Page number", "default": 1},
                "sort": {"type": "string", "enum": SORT_OPTIONS, "default": "POPULAR"}
            },
            "required": ["company_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let company = args
            .get("company_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing company_name".to_string())?;

        let mut headers = self.base_headers()?;

        if let Some(location) = args.get("location").and_then(|v| v.as_str()) {
            if !location.is_empty() {
                let location_id = self.resolve_location(&headers, location).await?;
                Self::push_header(&mut headers, "locationid", &location_id)?;
            }
        }
        if let Some(job_function) = args.get("job_function").and_then(|v| v.as_str()) {
            if !job_function.is_empty() {
                Self::push_header(&mut headers, "jobfunction", job_function)?;
            }
        }
        if let Some(yoe) = args.get("year_of_experience").and_then(|v| v.as_str()) {
            if YEARS_OF_EXPERIENCE.contains(&yoe) {
                Self::push_header(&mut headers, "yearofexperience", yoe)?;
            }
        }
        let sort = args
            .get("sort")
            .and_then(|v| v.as_str())
            .filter(|s| SORT_OPTIONS.contains(s))
            .unwrap_or("POPULAR");
        Self::push_header(&mut headers, "sort", sort)?;
        let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(DEFAULT_LIMIT);
        Self::push_header(&mut headers, "limit", &limit.to_string())?;
        let page = args.get("page").and_then(|v| v.as_u64()).unwrap_or(1);
        Self::push_header(&mut headers, "page", &page.to_string())?;

        let resp = self
            .client
            .get(&self.api_base)
            .headers(headers)
            .query(&[("query", company)])
            .send()
            .await
            .map_err(|e| format!("Salary request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Salary API returned HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read salary body: {}", e))?;

        if body.chars().count() > MAX_RESULT_CHARS {
            Ok(body.chars().take(MAX_RESULT_CHARS).collect::<String>() + "\n...[truncated]")
        } else {
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_company_is_an_error() {
        let tool = SalaryLookupTool::new("http://127.0.0.1:1", "http://127.0.0.1:1", "h", Some("k"), 1);
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(err.contains("Missing company_name"));
    }
}
