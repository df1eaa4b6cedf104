//! 编排引擎
//!
//! 每个用户轮次的驱动循环：流式完成 → 累积 → 派发工具 → 带结果续跑。
//! 用显式的深度计数循环代替递归，无论模型怎样连环请求工具，一轮最多发起
//! max_depth 次补全请求，到界即带着已累计的文本收束（安全阀，不是错误）。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::conversation::{Conversation, Message, ToolCallRef};
use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::orchestrator::accumulator::accumulate;
use crate::tools::ToolRegistry;

/// 默认递归上限（一轮内的补全请求次数）
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// 编排引擎：持有 LLM 客户端与只读工具注册表
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    max_depth: usize,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// 跑完一个用户轮次，返回所有补全趟次吐出文本的串联
    ///
    /// - 文本增量经 sink 即时转发（sink 关闭视为客户端断开，返回 Cancelled）；
    ///   每趟开始与派发工具之前都检查 sink 是否已关闭，纯工具趟次也不会在
    ///   死连接上继续发后端请求或派发工具
    /// - 工具故障折叠为 status=error 的 tool 消息，不终止轮次
    /// - 后端故障（请求失败或流中断）对本轮是终止性的：已流出的部分文本
    ///   已送达客户端，此处记录错误并返回 LlmError，由网关发错误提示；
    ///   连接保持打开，下一轮可继续
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        sink: Option<&mpsc::UnboundedSender<String>>,
    ) -> Result<String, AgentError> {
        let manifest = self.registry.manifest();
        let mut response_text = String::new();

        for depth in 0..self.max_depth {
            if sink.is_some_and(|tx| tx.is_closed()) {
                return Err(AgentError::Cancelled);
            }

            let stream = self
                .llm
                .complete_stream(conversation.messages(), &manifest)
                .await
                .map_err(AgentError::LlmError)?;

            let pass = accumulate(stream, sink).await?;
            response_text.push_str(&pass.text);

            if let Some(fault) = pass.fault {
                tracing::error!(error = %fault, depth, "completion backend failed mid-stream");
                return Err(AgentError::LlmError(fault));
            }

            if pass.calls.is_empty() {
                return Ok(response_text);
            }

            if sink.is_some_and(|tx| tx.is_closed()) {
                return Err(AgentError::Cancelled);
            }

            // 先派发本趟全部调用（每个调用一次尝试，不重试），再成对追加消息
            let mut results = Vec::with_capacity(pass.calls.len());
            for call in &pass.calls {
                results.push(
                    self.registry
                        .dispatch(&call.call_id, &call.name, &call.arguments)
                        .await,
                );
            }

            let refs: Vec<ToolCallRef> = pass
                .calls
                .iter()
                .map(|c| ToolCallRef {
                    call_id: c.call_id.clone(),
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                })
                .collect();
            conversation.push(Message::assistant_with_calls(response_text.clone(), refs));
            for result in results {
                conversation.push(Message::tool(result.call_id, result.status, result.content));
            }

            tracing::debug!(depth = depth + 1, calls = pass.calls.len(), "tool pass complete");
        }

        // 到达递归上限：工具结果留在对话里可供审计，但不再续跑
        tracing::warn!(
            max_depth = self.max_depth,
            "tool-call depth bound reached, returning accumulated text"
        );
        Ok(response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Role, ToolStatus};
    use crate::llm::{Fragment, MockLlmClient, ToolCallDelta};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::Value;

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "looks things up"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            Ok("42".to_string())
        }
    }

    struct FailingLookupTool;

    #[async_trait]
    impl Tool for FailingLookupTool {
        fn name(&self) -> &str {
            "lookup"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("exploded".to_string())
        }
    }

    fn engine_with(tool: impl Tool + 'static, llm: Arc<MockLlmClient>) -> Orchestrator {
        let mut registry = ToolRegistry::new(5);
        registry.register(tool);
        Orchestrator::new(llm, Arc::new(registry))
    }

    fn tool_call_pass() -> Vec<Fragment> {
        vec![
            Fragment::tool_call(ToolCallDelta::open("lookup", "a1", "")),
            Fragment::tool_call(ToolCallDelta::arguments(r#"{"x":"#)),
            Fragment::tool_call(ToolCallDelta::arguments(" 1}")),
        ]
    }

    #[tokio::test]
    async fn text_only_turn_makes_exactly_one_backend_call() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(vec![Fragment::text("4"), Fragment::text(".")]);
        let engine = engine_with(LookupTool, Arc::clone(&llm));

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("What's 2+2?"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "4.");
        assert_eq!(llm.stream_call_count(), 1);
        // 无工具调用则引擎不追加消息
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn tool_call_extends_history_and_triggers_second_pass() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(tool_call_pass());
        llm.push_script(vec![Fragment::text("the answer is 42")]);
        let engine = engine_with(LookupTool, Arc::clone(&llm));

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("look it up"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "the answer is 42");
        assert_eq!(llm.stream_call_count(), 2);
        // system, user, assistant(带调用引用), tool
        assert_eq!(conv.len(), 4);

        let assistant = &conv.messages()[2];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.tool_calls.len(), 1);
        assert_eq!(assistant.tool_calls[0].call_id, "a1");
        assert_eq!(assistant.tool_calls[0].arguments, r#"{"x": 1}"#);

        let tool_msg = &conv.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("a1"));
        assert_eq!(tool_msg.status, Some(ToolStatus::Success));
        assert_eq!(tool_msg.content, "42");
    }

    #[tokio::test]
    async fn handler_failure_is_absorbed_and_turn_continues() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(tool_call_pass());
        llm.push_script(vec![Fragment::text("sorry, lookup failed")]);
        let engine = engine_with(FailingLookupTool, Arc::clone(&llm));

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("look it up"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "sorry, lookup failed");
        assert_eq!(llm.stream_call_count(), 2);
        let tool_msg = &conv.messages()[3];
        assert_eq!(tool_msg.status, Some(ToolStatus::Error));
        assert!(tool_msg.content.contains("exploded"));
    }

    #[tokio::test]
    async fn depth_bound_caps_backend_calls() {
        let llm = Arc::new(MockLlmClient::new());
        // 模型每一趟都要求新的工具调用，远超上限
        for i in 0..20 {
            llm.push_script(vec![Fragment::tool_call(ToolCallDelta::open(
                "lookup",
                format!("c{}", i),
                "{}",
            ))]);
        }
        let engine = engine_with(LookupTool, Arc::clone(&llm));

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("loop forever"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "");
        assert_eq!(llm.stream_call_count(), DEFAULT_MAX_DEPTH);
        // 每趟追加一对 assistant/tool 消息
        assert_eq!(conv.len(), 2 + DEFAULT_MAX_DEPTH * 2);
    }

    #[tokio::test]
    async fn mid_stream_fault_surfaces_after_streaming_partial_text() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script_raw(vec![
            Ok(Fragment::text("partial")),
            Err("backend hiccup".to_string()),
        ]);
        let engine = engine_with(LookupTool, Arc::clone(&llm));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("hi"));
        let result = engine.run_turn(&mut conv, Some(&tx)).await;

        assert!(matches!(result, Err(AgentError::LlmError(_))));
        // 故障前的文本已经流出
        assert_eq!(rx.recv().await.unwrap(), "partial");
        // 故障趟次不扩展对话
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn dead_sink_stops_tool_only_passes_before_any_dispatch() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingTool(Arc<AtomicUsize>);

        #[async_trait]
        impl Tool for CountingTool {
            fn name(&self) -> &str {
                "lookup"
            }
            fn description(&self) -> &str {
                "counts dispatches"
            }
            async fn execute(&self, _args: Value) -> Result<String, String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok("42".to_string())
            }
        }

        let llm = Arc::new(MockLlmClient::new());
        // 纯工具趟次，不含任何文本分片：断开只能靠趟前检查发现
        for i in 0..3 {
            llm.push_script(vec![Fragment::tool_call(ToolCallDelta::open(
                "lookup",
                format!("c{}", i),
                "{}",
            ))]);
        }
        let dispatches = Arc::new(AtomicUsize::new(0));
        let engine = engine_with(CountingTool(Arc::clone(&dispatches)), Arc::clone(&llm));

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(rx);

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("look it up"));
        let result = engine.run_turn(&mut conv, Some(&tx)).await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        // 客户端已断开：不发后端请求、不派发工具、不扩展对话
        assert_eq!(llm.stream_call_count(), 0);
        assert_eq!(dispatches.load(Ordering::SeqCst), 0);
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn custom_max_depth_is_honored() {
        let llm = Arc::new(MockLlmClient::new());
        for i in 0..10 {
            llm.push_script(vec![Fragment::tool_call(ToolCallDelta::open(
                "lookup",
                format!("c{}", i),
                "{}",
            ))]);
        }
        let engine = engine_with(LookupTool, Arc::clone(&llm)).with_max_depth(2);

        let mut conv = Conversation::seeded("sys");
        conv.push(Message::user("loop"));
        engine.run_turn(&mut conv, None).await.unwrap();
        assert_eq!(llm.stream_call_count(), 2);
    }
}
