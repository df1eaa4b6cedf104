//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本逐次返回预设的 Fragment 序列：第 N 次 complete_stream 调用吐出第 N 段
//! 脚本；脚本耗尽后返回空流。便于在本地验证累积器与编排循环。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use crate::conversation::{Message, Role};
use crate::llm::{Fragment, FragmentStream, LlmClient, ToolSpec};

/// Mock 客户端：complete 回显最后一条 user 消息，complete_stream 按脚本回放
#[derive(Debug, Default)]
pub struct MockLlmClient {
    scripts: Mutex<VecDeque<Vec<Result<Fragment, String>>>>,
    /// complete_stream 被调用的次数
    pub stream_calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一段脚本：下一次 complete_stream 将按顺序吐出这些分片
    pub fn push_script(&self, fragments: Vec<Fragment>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(fragments.into_iter().map(Ok).collect());
    }

    /// 追加一段含错误项的脚本（模拟后端中途出错）
    pub fn push_script_raw(&self, items: Vec<Result<Fragment, String>>) {
        self.scripts.lock().unwrap().push_back(items);
    }

    pub fn stream_call_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }

    async fn complete_stream(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<FragmentStream, String> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let items = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(stream::iter(items)))
    }
}
