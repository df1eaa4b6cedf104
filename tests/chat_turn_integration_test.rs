//! 聊天轮次集成测试
//!
//! 用脚本化的 Mock 后端走完整条链路：会话播种 → 用户消息 → 流式累积 →
//! 工具派发 → 带结果续跑 → 归还对话。

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use scout::conversation::{Message, Role, ToolStatus};
    use scout::error::AgentError;
    use scout::gateway::SessionManager;
    use scout::llm::{Fragment, MockLlmClient, ToolCallDelta};
    use scout::orchestrator::Orchestrator;
    use scout::tools::{Tool, ToolRegistry};

    struct SalaryStub;

    #[async_trait]
    impl Tool for SalaryStub {
        fn name(&self) -> &str {
            "search_job_salary"
        }
        fn description(&self) -> &str {
            "stubbed salary lookup"
        }
        async fn execute(&self, args: Value) -> Result<String, String> {
            let company = args["company"].as_str().unwrap_or("?");
            Ok(format!("{}: median 180k", company))
        }
    }

    struct NewsStub;

    #[async_trait]
    impl Tool for NewsStub {
        fn name(&self) -> &str {
            "search_company_news"
        }
        fn description(&self) -> &str {
            "stubbed news search"
        }
        async fn execute(&self, args: Value) -> Result<String, String> {
            let keyword = args["keyword"].as_str().unwrap_or("?");
            Ok(format!("3 articles about {}", keyword))
        }
    }

    fn engine(llm: Arc<MockLlmClient>) -> Orchestrator {
        let mut registry = ToolRegistry::new(5);
        registry.register(SalaryStub);
        registry.register(NewsStub);
        Orchestrator::new(llm, Arc::new(registry))
    }

    #[tokio::test]
    async fn full_turn_streams_text_and_persists_history() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(vec![
            Fragment::text("Let me check. "),
            Fragment::tool_call(ToolCallDelta::open("search_job_salary", "c1", "")),
            Fragment::tool_call(ToolCallDelta::arguments(r#"{"company":"#)),
            Fragment::tool_call(ToolCallDelta::arguments(r#" "Acme"}"#)),
        ]);
        llm.push_script(vec![
            Fragment::text("Acme pays a median of "),
            Fragment::text("180k."),
        ]);
        let engine = engine(Arc::clone(&llm));

        let sessions = SessionManager::new("career advisor, today is {date}");
        let session_id = sessions.create().await;
        let mut conv = sessions.take_conversation(&session_id).await.unwrap();
        conv.push(Message::user("What does Acme pay?"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let text = engine.run_turn(&mut conv, Some(&tx)).await.unwrap();
        sessions.put_conversation(&session_id, conv).await;
        drop(tx);

        assert_eq!(text, "Let me check. Acme pays a median of 180k.");

        // 文本增量按到达顺序即时转发
        let mut streamed = Vec::new();
        while let Some(chunk) = rx.recv().await {
            streamed.push(chunk);
        }
        assert_eq!(
            streamed,
            vec!["Let me check. ", "Acme pays a median of ", "180k."]
        );

        // system, user, assistant(调用), tool
        let conv = sessions.take_conversation(&session_id).await.unwrap();
        assert_eq!(conv.len(), 4);
        let tool_msg = &conv.messages()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.status, Some(ToolStatus::Success));
        assert_eq!(tool_msg.content, "Acme: median 180k");
    }

    #[tokio::test]
    async fn interleaved_calls_in_one_pass_are_dispatched_in_announcement_order() {
        let llm = Arc::new(MockLlmClient::new());
        // 两个调用的参数片段交错到达；归属跟随最近一次宣告
        llm.push_script(vec![
            Fragment::tool_call(ToolCallDelta::open("search_job_salary", "s1", r#"{"company""#)),
            Fragment::tool_call(ToolCallDelta::arguments(r#": "Acme"}"#)),
            Fragment::tool_call(ToolCallDelta::open("search_company_news", "n1", r#"{"keyword""#)),
            Fragment::tool_call(ToolCallDelta::arguments(r#": "Acme layoffs"}"#)),
        ]);
        llm.push_script(vec![Fragment::text("done")]);
        let engine = engine(Arc::clone(&llm));

        let mut conv = scout::conversation::Conversation::seeded("sys");
        conv.push(Message::user("salary and news for Acme"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "done");
        // assistant 消息带两条调用引用，tool 消息按宣告顺序成对跟随
        assert_eq!(conv.len(), 5);
        let assistant = &conv.messages()[2];
        assert_eq!(assistant.tool_calls.len(), 2);
        assert_eq!(assistant.tool_calls[0].name, "search_job_salary");
        assert_eq!(assistant.tool_calls[1].name, "search_company_news");
        assert_eq!(conv.messages()[3].content, "Acme: median 180k");
        assert_eq!(conv.messages()[4].content, "3 articles about Acme layoffs");
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_result_and_turn_survives() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(vec![Fragment::tool_call(ToolCallDelta::open(
            "no_such_tool",
            "x1",
            "{}",
        ))]);
        llm.push_script(vec![Fragment::text("I could not use that tool.")]);
        let engine = engine(Arc::clone(&llm));

        let mut conv = scout::conversation::Conversation::seeded("sys");
        conv.push(Message::user("use the mystery tool"));
        let text = engine.run_turn(&mut conv, None).await.unwrap();

        assert_eq!(text, "I could not use that tool.");
        let tool_msg = &conv.messages()[3];
        assert_eq!(tool_msg.status, Some(ToolStatus::Error));
        assert_eq!(tool_msg.content, "No tool with name: no_such_tool");
    }

    #[tokio::test]
    async fn closed_sink_cancels_the_turn() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(vec![Fragment::text("hello")]);
        let engine = engine(Arc::clone(&llm));

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(rx);

        let mut conv = scout::conversation::Conversation::seeded("sys");
        conv.push(Message::user("hi"));
        let result = engine.run_turn(&mut conv, Some(&tx)).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let llm = Arc::new(MockLlmClient::new());
        llm.push_script(vec![Fragment::text("hi a")]);
        let engine = engine(Arc::clone(&llm));

        let sessions = SessionManager::new("sys");
        let a = sessions.create().await;
        let b = sessions.create().await;

        let mut conv_a = sessions.take_conversation(&a).await.unwrap();
        conv_a.push(Message::user("hello from a"));
        let reply = engine.run_turn(&mut conv_a, None).await.unwrap();
        conv_a.push(Message::assistant(reply));
        sessions.put_conversation(&a, conv_a).await;

        let conv_b = sessions.take_conversation(&b).await.unwrap();
        assert_eq!(conv_b.len(), 1);
        assert_eq!(conv_b.messages()[0].role, Role::System);
    }
}
