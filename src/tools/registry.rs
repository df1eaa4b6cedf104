//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! 按规范名精确匹配注册与查找（不做子串匹配）。dispatch 负责解析参数、加超时
//! 调用并把一切故障折叠为 status=error 的 ToolResult——每个被派发的 call_id
//! 都必定得到一条结果，对话侧永远能看到完整的一轮。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;

use crate::conversation::ToolStatus;
use crate::llm::ToolSpec;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具规范名（模型调用时使用）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    /// 默认返回空对象，表示无参数或参数格式不限
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 一次工具调用的结果，总是可归属到唯一的 call_id
#[derive(Clone, Debug)]
pub struct ToolResult {
    pub call_id: String,
    pub status: ToolStatus,
    pub content: String,
}

impl ToolResult {
    fn success(call_id: &str, content: String) -> Self {
        Self {
            call_id: call_id.to_string(),
            status: ToolStatus::Success,
            content,
        }
    }

    fn error(call_id: &str, content: String) -> Self {
        Self {
            call_id: call_id.to_string(),
            status: ToolStatus::Error,
            content,
        }
    }
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，启动后只读
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ToolRegistry {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            tools: HashMap::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// 已注册工具名（启动日志用）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 下发给模型的工具清单
    pub fn manifest(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// 派发一次已重组的调用
    ///
    /// 未知工具名、参数解析失败、执行返回 Err、超时，全部转为 status=error 的
    /// 结果返回，绝不向调用方抛错；每次派发输出一条 JSON 审计日志。
    pub async fn dispatch(&self, call_id: &str, name: &str, raw_args: &str) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::error(call_id, format!("No tool with name: {}", name));
        };

        let args: Value = if raw_args.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(raw_args) {
                Ok(v) => v,
                Err(e) => {
                    return ToolResult::error(
                        call_id,
                        format!(
                            "Cannot parse arguments for call {}: {} (payload: {})",
                            call_id,
                            e,
                            preview(raw_args)
                        ),
                    );
                }
            }
        };

        let start = Instant::now();
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": name,
            "call_id": call_id,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": preview(raw_args),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => ToolResult::success(call_id, content),
            Ok(Err(e)) => ToolResult::error(call_id, format!("Tool {} failed: {}", name, e)),
            Err(_) => ToolResult::error(
                call_id,
                format!("Tool {} timed out after {}s", name, self.timeout.as_secs()),
            ),
        }
    }
}

fn preview(s: &str) -> String {
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
