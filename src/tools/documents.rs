//! 文档检索工具：按 document_id 取回已抽取文本
//!
//! 抽取与存储由 DocumentStore 协作方负责；找不到时返回结构化 not_found，
//! 让模型自行向用户解释。

use async_trait::async_trait;
use serde_json::Value;

use crate::store::SharedDocumentStore;
use crate::tools::Tool;

pub struct DocumentRetrievalTool {
    store: SharedDocumentStore,
}

impl DocumentRetrievalTool {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DocumentRetrievalTool {
    fn name(&self) -> &str {
        "get_uploaded_document"
    }

    fn description(&self) -> &str {
        "Retrieve an uploaded document (resume, job description, etc.) by its document ID. Use this when the user references a document ID in their message."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "document_id": {"type": "string", "description": "The UUID of the uploaded document"}
            },
            "required": ["document_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let document_id = args
            .get("document_id")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        match self.store.get(document_id).await {
            Some(doc) => serde_json::to_string(&serde_json::json!({
                "status": "found",
                "document_id": doc.id,
                "filename": doc.original_filename,
                "type": doc.file_type,
                "content": doc.extracted_text,
            }))
            .map_err(|e| e.to_string()),
            None => serde_json::to_string(&serde_json::json!({
                "status": "not_found",
                "document_id": document_id,
                "error": "Document not found. Please check the ID.",
            }))
            .map_err(|e| e.to_string()),
        }
    }
}
