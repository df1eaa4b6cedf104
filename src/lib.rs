//! Scout - Rust 求职情报对话后端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **conversation**: 只追加的对话序列与消息类型
//! - **error**: 统一错误类型
//! - **gateway**: WebSocket 网关、入站协议与会话管理
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **orchestrator**: 流式工具调用编排（碎片聚合 + 深度受限的递归续跑）
//! - **store**: 文档与裁员数据存储
//! - **tools**: 工具箱（裁员、新闻、网页搜索、薪资、文档、分析）与注册表

pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod observability;
pub mod orchestrator;
pub mod store;
pub mod tools;
