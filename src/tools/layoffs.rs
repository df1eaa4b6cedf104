//! 裁员数据工具：按条件查询科技行业裁员记录
//!
//! 数据本身由 LayoffStore 协作方提供，这里只做参数映射与结果排版。

use async_trait::async_trait;
use serde_json::Value;

use crate::store::{LayoffFilter, LayoffRecord, SharedLayoffStore, LAYOFF_PAGE_LIMIT};
use crate::tools::Tool;

/// 查询最近裁员记录
pub struct RecentLayoffsTool {
    store: SharedLayoffStore,
}

impl RecentLayoffsTool {
    pub fn new(store: SharedLayoffStore) -> Self {
        Self { store }
    }
}

fn render_records(records: &[LayoffRecord]) -> String {
    if records.is_empty() {
        return "No layoff records matched the given filters.".to_string();
    }
    let mut out = String::from("| Company | HQ | Industry | Laid Off | % | Date | Stage | Country |\n");
    out.push_str("|---|---|---|---|---|---|---|---|\n");
    for r in records {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            r.company,
            r.hq_location,
            r.industry,
            r.laid_off_count.map_or("-".to_string(), |n| n.to_string()),
            r.percentage.map_or("-".to_string(), |p| format!("{:.1}", p)),
            r.date,
            r.stage,
            r.country,
        ));
    }
    out
}

#[async_trait]
impl Tool for RecentLayoffsTool {
    fn name(&self) -> &str {
        "get_recent_layoffs"
    }

    fn description(&self) -> &str {
        "Get recent layoffs in the tech industry, filterable by company, look-back window, HQ location, industry, date, stage and country. Pagination via offset, page size 20."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "company_name": {"type": "string", "description": "Name of the company"},
                "days_to_look_back": {"type": "integer", "description": "Number of days to look back", "default": 5},
                "hq_location": {"type": "string", "description": "Headquarters location"},
                "tech_industry_type": {"type": "string", "description": "Industry, e.g. Transportation, Finance"},
                "layoff_date": {"type": "string", "description": "Specific date (YYYY-MM-DD)"},
                "layoff_stage": {"type": "string", "description": "Funding stage of the company"},
                "country": {"type": "string", "description": "Country of the layoffs"},
                "offset": {"type": "integer", "description": "Pagination offset", "default": 0}
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let date = match args.get("layoff_date").and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => Some(
                s.parse::<chrono::NaiveDate>()
                    .map_err(|e| format!("Invalid layoff_date {:?}: {}", s, e))?,
            ),
            _ => None,
        };
        let filter = LayoffFilter {
            company: str_arg(&args, "company_name"),
            days_to_look_back: args.get("days_to_look_back").and_then(|v| v.as_i64()),
            hq_location: str_arg(&args, "hq_location"),
            industry: str_arg(&args, "tech_industry_type"),
            date,
            stage: str_arg(&args, "layoff_stage"),
            country: str_arg(&args, "country"),
            offset: args.get("offset").and_then(|v| v.as_u64()).unwrap_or(0) as usize,
        };

        let records = self.store.recent(&filter).await?;
        tracing::info!(hits = records.len(), limit = LAYOFF_PAGE_LIMIT, "layoff lookup");
        Ok(render_records(&records))
    }
}

fn str_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// 查询 get_recent_layoffs 各过滤字段的可取值
pub struct LayoffFieldValuesTool {
    store: SharedLayoffStore,
}

impl LayoffFieldValuesTool {
    pub fn new(store: SharedLayoffStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for LayoffFieldValuesTool {
    fn name(&self) -> &str {
        "layoff_field_values"
    }

    fn description(&self) -> &str {
        "List the possible values of a get_recent_layoffs filter field (company_name, hq_location, tech_industry_type, layoff_stage, country)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "field_name": {"type": "string", "description": "The filter field to enumerate"}
            },
            "required": ["field_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let field = args
            .get("field_name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "Missing field_name".to_string())?;
        let values = self.store.field_values(field).await?;
        serde_json::to_string(&values).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLayoffStore;
    use std::sync::Arc;

    fn seeded_store() -> SharedLayoffStore {
        Arc::new(InMemoryLayoffStore::new())
    }

    #[tokio::test]
    async fn renders_empty_result_message() {
        let tool = RecentLayoffsTool::new(seeded_store());
        let out = tool
            .execute(serde_json::json!({"company_name": "nobody"}))
            .await
            .unwrap();
        assert!(out.contains("No layoff records"));
    }

    #[tokio::test]
    async fn rejects_malformed_date() {
        let tool = RecentLayoffsTool::new(seeded_store());
        let err = tool
            .execute(serde_json::json!({"layoff_date": "last tuesday"}))
            .await
            .unwrap_err();
        assert!(err.contains("Invalid layoff_date"));
    }

    #[tokio::test]
    async fn field_values_requires_field_name() {
        let tool = LayoffFieldValuesTool::new(seeded_store());
        assert!(tool.execute(serde_json::json!({})).await.is_err());
    }
}
