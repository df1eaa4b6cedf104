//! 外部存储协作方的窄接口
//!
//! 文档抽取/去重与关系型持久化不在本 crate 范围内，这里只定义查询侧契约，
//! 并提供内存实现（测试与单机演示用）。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 已抽取为纯文本的上传文档（简历、JD 等）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub original_filename: String,
    pub file_type: String,
    pub extracted_text: String,
}

/// 文档存储查询接口
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, document_id: &str) -> Option<StoredDocument>;
}

/// 内存文档存储
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, doc: StoredDocument) {
        self.documents.write().await.insert(doc.id.clone(), doc);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, document_id: &str) -> Option<StoredDocument> {
        self.documents.read().await.get(document_id).cloned()
    }
}

/// 一条裁员记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoffRecord {
    pub company: String,
    pub hq_location: String,
    pub industry: String,
    pub laid_off_count: Option<u64>,
    pub percentage: Option<f64>,
    pub date: NaiveDate,
    pub stage: String,
    pub country: String,
}

/// 裁员记录查询过滤条件；None 字段不过滤
#[derive(Clone, Debug, Default)]
pub struct LayoffFilter {
    pub company: Option<String>,
    pub days_to_look_back: Option<i64>,
    pub hq_location: Option<String>,
    pub industry: Option<String>,
    pub date: Option<NaiveDate>,
    pub stage: Option<String>,
    pub country: Option<String>,
    pub offset: usize,
}

/// 单页返回上限
pub const LAYOFF_PAGE_LIMIT: usize = 20;

/// 裁员数据查询接口
#[async_trait]
pub trait LayoffStore: Send + Sync {
    /// 按过滤条件查询，按日期倒序，分页上限 LAYOFF_PAGE_LIMIT
    async fn recent(&self, filter: &LayoffFilter) -> Result<Vec<LayoffRecord>, String>;

    /// 某个过滤字段的全部去重取值（如 industry、stage、country）
    async fn field_values(&self, field: &str) -> Result<Vec<String>, String>;
}

/// 内存裁员数据存储
#[derive(Default)]
pub struct InMemoryLayoffStore {
    records: RwLock<Vec<LayoffRecord>>,
}

impl InMemoryLayoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: LayoffRecord) {
        self.records.write().await.push(record);
    }
}

fn matches_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl LayoffStore for InMemoryLayoffStore {
    async fn recent(&self, filter: &LayoffFilter) -> Result<Vec<LayoffRecord>, String> {
        let records = self.records.read().await;
        let cutoff = filter
            .days_to_look_back
            .map(|days| chrono::Utc::now().date_naive() - chrono::Duration::days(days));

        let mut hits: Vec<LayoffRecord> = records
            .iter()
            .filter(|r| {
                cutoff.map_or(true, |c| r.date >= c)
                    && filter.company.as_deref().map_or(true, |v| matches_ci(&r.company, v))
                    && filter
                        .hq_location
                        .as_deref()
                        .map_or(true, |v| matches_ci(&r.hq_location, v))
                    && filter.industry.as_deref().map_or(true, |v| matches_ci(&r.industry, v))
                    && filter.date.map_or(true, |v| r.date == v)
                    && filter.stage.as_deref().map_or(true, |v| matches_ci(&r.stage, v))
                    && filter.country.as_deref().map_or(true, |v| matches_ci(&r.country, v))
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(hits
            .into_iter()
            .skip(filter.offset)
            .take(LAYOFF_PAGE_LIMIT)
            .collect())
    }

    async fn field_values(&self, field: &str) -> Result<Vec<String>, String> {
        let records = self.records.read().await;
        let mut values: Vec<String> = match field {
            "company_name" => records.iter().map(|r| r.company.clone()).collect(),
            "hq_location" => records.iter().map(|r| r.hq_location.clone()).collect(),
            "tech_industry_type" => records.iter().map(|r| r.industry.clone()).collect(),
            "layoff_stage" => records.iter().map(|r| r.stage.clone()).collect(),
            "country" => records.iter().map(|r| r.country.clone()).collect(),
            other => return Err(format!("Unknown layoff field: {}", other)),
        };
        values.sort();
        values.dedup();
        Ok(values)
    }
}


/// 共享句柄别名
pub type SharedDocumentStore = Arc<dyn DocumentStore>;
pub type SharedLayoffStore = Arc<dyn LayoffStore>;
