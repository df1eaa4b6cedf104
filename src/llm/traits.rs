//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（非流式）、
//! complete_stream（流式，产出 Fragment：文本增量与/或工具调用增量）。
//! 后端各自的分片格式在适配层统一为 Fragment，累积器不感知后端细节。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;

use crate::conversation::Message;

/// 一次流式响应的增量单元：文本增量与工具调用增量可同时出现
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    /// 文本增量（None 或空串时无文本效果）
    pub text: Option<String>,
    /// 本分片携带的工具调用增量（一个分片可带多条）
    pub tool_calls: Vec<ToolCallDelta>,
}

impl Fragment {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            text: None,
            tool_calls: vec![delta],
        }
    }
}

/// 工具调用增量
///
/// (name, call_id) 仅在开启一次新调用的分片上成对出现；后续分片只带 arguments
/// 片段，归属于最近一次开启的调用（游标式拼接，协议不会在每个分片上重复宣告）。
#[derive(Clone, Debug, Default)]
pub struct ToolCallDelta {
    pub name: Option<String>,
    pub call_id: Option<String>,
    /// 参数 JSON 字符串片段，按到达顺序拼接
    pub arguments: String,
}

impl ToolCallDelta {
    /// 宣告一次新调用（可同时携带首个参数片段）
    pub fn open(
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            call_id: Some(call_id.into()),
            arguments: arguments.into(),
        }
    }

    /// 仅携带参数片段的后续增量
    pub fn arguments(fragment: impl Into<String>) -> Self {
        Self {
            name: None,
            call_id: None,
            arguments: fragment.into(),
        }
    }
}

/// 流式完成返回的惰性分片序列；不可重启，流结束即一轮输出完毕
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, String>> + Send>>;

/// 注册工具对外暴露的清单条目（随流式请求下发给模型）
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// 参数 JSON Schema
    pub parameters: Value,
}

/// LLM 客户端 trait：非流式完成与流式完成（带工具清单）
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条回复文本
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 流式完成；tools 为空时不下发工具清单
    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<FragmentStream, String>;
}
