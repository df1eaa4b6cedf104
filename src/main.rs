//! Scout - Rust 求职情报对话后端
//!
//! 入口：初始化日志、加载配置、装配工具注册表与编排引擎，启动 WebSocket 网关。

use std::sync::Arc;

use anyhow::Context;
use scout::config::load_config;
use scout::gateway::{ChatGateway, GatewayConfig, SessionManager};
use scout::llm::{LlmClient, OpenAiClient};
use scout::orchestrator::Orchestrator;
use scout::store::{InMemoryDocumentStore, InMemoryLayoffStore, SharedDocumentStore, SharedLayoffStore};
use scout::tools::{
    AnalyzeJobDescriptionTool, AnalyzeResumeTool, CandidateFitTool, CompanyNewsTool,
    DocumentRetrievalTool, GoogleSearchTool, LayoffFieldValuesTool, RecentLayoffsTool,
    SalaryLookupTool, ToolRegistry, WebSearchTool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scout::observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        None,
    ));

    let documents: SharedDocumentStore = Arc::new(InMemoryDocumentStore::new());
    let layoffs: SharedLayoffStore = Arc::new(InMemoryLayoffStore::new());

    let mut registry = ToolRegistry::new(cfg.tools.tool_timeout_secs);
    registry.register(RecentLayoffsTool::new(Arc::clone(&layoffs)));
    registry.register(LayoffFieldValuesTool::new(Arc::clone(&layoffs)));
    registry.register(DocumentRetrievalTool::new(Arc::clone(&documents)));
    registry.register(CompanyNewsTool::new(
        &cfg.tools.news_api_base,
        None,
        cfg.tools.http_timeout_secs,
    ));
    registry.register(WebSearchTool::new(
        &cfg.tools.web_search_api_base,
        None,
        cfg.tools.http_timeout_secs,
    ));
    registry.register(GoogleSearchTool::new(
        &cfg.tools.google_search_api_base,
        &cfg.tools.google_search_cx,
        None,
        cfg.tools.http_timeout_secs,
    ));
    registry.register(SalaryLookupTool::new(
        &cfg.tools.salary_api_base,
        &cfg.tools.salary_location_api_base,
        &cfg.tools.salary_api_host,
        None,
        cfg.tools.http_timeout_secs,
    ));
    registry.register(AnalyzeJobDescriptionTool::new(Arc::clone(&llm)));
    registry.register(AnalyzeResumeTool::new(Arc::clone(&llm)));
    registry.register(CandidateFitTool::new(Arc::clone(&llm)));

    tracing::info!(tools = ?registry.tool_names(), "tool registry assembled");

    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&llm), Arc::new(registry))
            .with_max_depth(cfg.gateway.max_tool_depth),
    );
    let sessions = Arc::new(SessionManager::new(cfg.app.system_prompt.clone()));

    let gateway = ChatGateway::new(
        GatewayConfig {
            bind_addr: cfg.gateway.bind_addr.clone(),
            max_connections: cfg.gateway.max_connections,
        },
        sessions,
        orchestrator,
        documents,
    );
    gateway.start().await.context("Failed to start gateway")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    gateway.stop().await;

    Ok(())
}
